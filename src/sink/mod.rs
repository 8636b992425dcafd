pub mod local_dir;
pub mod s3;

use std::path::Path;

use crate::error::SinkError;

pub use local_dir::LocalDirSink;
pub use s3::S3Sink;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Durable storage for transcripts and, optionally, the source audio.
///
/// Every method returns a human-readable location of the stored artifact.
pub trait ArtifactSink: Send {
    fn name(&self) -> &str;

    fn put_bytes(&self, key: &str, body: &[u8], content_type: &str) -> Result<String, SinkError>;

    fn put_text(&self, key: &str, text: &str) -> Result<String, SinkError> {
        self.put_bytes(key, text.as_bytes(), TEXT_CONTENT_TYPE)
    }

    fn put_file(&self, key: &str, path: &Path) -> Result<String, SinkError> {
        let body = std::fs::read(path)?;
        self.put_bytes(key, &body, WAV_CONTENT_TYPE)
    }
}

/// Keys are relative, slash-separated, and may not escape the sink root.
pub fn validate_key(key: &str) -> Result<(), SinkError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if invalid {
        Err(SinkError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
