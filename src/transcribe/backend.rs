use crate::audio::AudioChunk;
use crate::error::RecognitionError;

/// Speech-recognition capability used by the orchestrator.
///
/// Implementations are shared across worker threads, and must map a "no
/// speech" result to `RecognitionError::Unrecognized` and every other failure
/// to `RecognitionError::Service`.
pub trait RecognitionClient: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, chunk: &AudioChunk<'_>, locale: &str) -> Result<String, RecognitionError>;
}

/// Primary language subtag of a BCP-47 locale ("en-US" -> "en").
pub fn language_code(locale: &str) -> &str {
    locale
        .split(['-', '_'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(locale)
}
