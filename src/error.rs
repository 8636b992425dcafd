use std::path::PathBuf;

use thiserror::Error;

use crate::transcribe::orchestrator::ChunkDiagnostic;

/// The source could not be turned into a local, decodable audio asset.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("source unreachable: {0}")]
    Unreachable(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("external tool failed: {0}")]
    Tool(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error during acquisition: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("chunk duration must cover at least one frame (got {0:?})")]
    InvalidChunkDuration(std::time::Duration),

    #[error("malformed audio asset: {0}")]
    MalformedAsset(String),
}

/// Outcome of a failed recognition call for a single chunk.
///
/// The two variants carry different user-facing messages, so backends must
/// keep "no speech" apart from "the service broke".
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("no intelligible speech detected")]
    Unrecognized,

    #[error("{0}")]
    Service(String),
}

impl From<std::io::Error> for RecognitionError {
    fn from(e: std::io::Error) -> Self {
        Self::Service(format!("I/O error: {}", e))
    }
}

impl From<hound::Error> for RecognitionError {
    fn from(e: hound::Error) -> Self {
        Self::Service(format!("WAV encoding error: {}", e))
    }
}

impl From<reqwest::Error> for RecognitionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Service(format!("request timed out: {}", e))
        } else {
            Self::Service(format!("request failed: {}", e))
        }
    }
}

#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Every chunk degraded, or there was nothing to transcribe.
    #[error("no transcript produced ({} chunk diagnostic(s))", diagnostics.len())]
    NoTranscriptProduced { diagnostics: Vec<ChunkDiagnostic> },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("artifact sink unavailable: {0}")]
    Unavailable(String),

    #[error("invalid artifact key: {0:?}")]
    InvalidKey(String),

    #[error("artifact sink rejected upload (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to sign upload request: {0}")]
    Signing(String),

    #[error("I/O error writing artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal failures of a single pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_error_messages_are_distinct() {
        let unrecognized = RecognitionError::Unrecognized.to_string();
        let service = RecognitionError::Service("HTTP 503".to_string()).to_string();
        assert_ne!(unrecognized, service);
        assert_eq!(service, "HTTP 503");
    }

    #[test]
    fn test_io_error_maps_to_service_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: RecognitionError = io.into();
        assert!(matches!(err, RecognitionError::Service(ref d) if d.contains("disk full")));
    }

    #[test]
    fn test_pipeline_error_is_transparent() {
        let err: PipelineError = AcquisitionError::Unreachable("example.com".to_string()).into();
        assert_eq!(err.to_string(), "source unreachable: example.com");
    }

    #[test]
    fn test_total_failure_message() {
        let err = TranscriptionError::NoTranscriptProduced {
            diagnostics: Vec::new(),
        };
        assert!(err.to_string().starts_with("no transcript produced"));
    }
}
