use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, TranscriptionError};
use crate::pipeline::{Persistence, RunOutcome};

const HISTORY_FILE_NAME: &str = "history.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every chunk produced text.
    Complete,
    /// A transcript was produced but some chunks contributed nothing.
    Degraded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Degraded => write!(f, "degraded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One line of `history.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: String,
    pub source: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_secs: Option<f64>,
    pub chunks: usize,
    pub recognized: usize,
    pub words: usize,
    pub diagnostics: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stored: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let report = &outcome.report;
        let (stored, error) = match &outcome.persistence {
            Persistence::Skipped => (Vec::new(), None),
            Persistence::Stored { locations } => (locations.clone(), None),
            Persistence::Failed { stored, error } => {
                (stored.clone(), Some(format!("persistence failed: {}", error)))
            }
        };
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            source: outcome.source.clone(),
            status: if report.is_degraded() {
                RunStatus::Degraded
            } else {
                RunStatus::Complete
            },
            audio_secs: Some(outcome.audio_duration.as_secs_f64()),
            chunks: report.chunk_count,
            recognized: report.recognized_count(),
            words: report.transcript.word_count(),
            diagnostics: report.diagnostics.len(),
            stored,
            error,
        }
    }

    pub fn from_error(source: &str, error: &PipelineError) -> Self {
        let (chunks, diagnostics) = match error {
            PipelineError::Transcription(TranscriptionError::NoTranscriptProduced {
                diagnostics,
            }) => (diagnostics.len(), diagnostics.len()),
            _ => (0, 0),
        };
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            source: source.to_string(),
            status: RunStatus::Failed,
            audio_secs: None,
            chunks,
            recognized: 0,
            words: 0,
            diagnostics,
            stored: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

pub fn history_path(dir: &Path) -> PathBuf {
    dir.join(HISTORY_FILE_NAME)
}

/// Append a record as one JSON line.
pub fn append(dir: &Path, record: &RunRecord) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = history_path(dir);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Load all records, oldest first. Malformed lines are skipped with a warning.
pub fn load(dir: &Path) -> Result<Vec<RunRecord>> {
    let path = history_path(dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse line {} of {}: {}",
                    line_num + 1,
                    path.display(),
                    e
                );
            }
        }
    }
    Ok(records)
}
