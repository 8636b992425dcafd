pub mod azure_openai;
pub mod backend;
pub mod orchestrator;
#[cfg(feature = "whisper")]
pub mod whisper_local;
