// Transcription orchestrator: drives chunks through a RecognitionClient and
// reduces the per-index results into one ordered transcript.
//
// A failed chunk never aborts the run. Its slot in the result table stays
// empty and a diagnostic is recorded. The transcript is assembled strictly by
// chunk index once every chunk has a result, so completion order (which varies
// with `workers > 1`) cannot affect the output.

use std::fmt;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::audio::AudioChunk;
use crate::error::{RecognitionError, TranscriptionError};
use crate::transcribe::backend::RecognitionClient;

/// Outcome of recognizing one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentResult {
    Ok(String),
    Unrecognized,
    ServiceError(String),
}

impl From<Result<String, RecognitionError>> for SegmentResult {
    fn from(result: Result<String, RecognitionError>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Self::Unrecognized,
            Ok(text) => Self::Ok(text.trim().to_string()),
            Err(RecognitionError::Unrecognized) => Self::Unrecognized,
            Err(RecognitionError::Service(detail)) => Self::ServiceError(detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A caller-visible note about a chunk that contributed no text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDiagnostic {
    /// 0-based chunk index.
    pub index: usize,
    pub severity: Severity,
    pub message: String,
}

impl ChunkDiagnostic {
    /// 1-based chunk number, as shown to users.
    pub fn chunk_number(&self) -> usize {
        self.index + 1
    }
}

impl fmt::Display for ChunkDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: chunk {}: {}", label, self.chunk_number(), self.message)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Space,
    Newline,
}

impl Separator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::Newline => "\n",
        }
    }
}

/// Ordered concatenation of the recognized chunk texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    segments: usize,
}

impl Transcript {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Number of chunks that contributed text.
    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionReport {
    pub transcript: Transcript,
    /// Diagnostics in ascending chunk order.
    pub diagnostics: Vec<ChunkDiagnostic>,
    pub chunk_count: usize,
}

impl TranscriptionReport {
    pub fn recognized_count(&self) -> usize {
        self.transcript.segments()
    }

    /// True when at least one chunk contributed nothing.
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    workers: usize,
    separator: Separator,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(1, Separator::Space)
    }
}

impl Orchestrator {
    /// `workers <= 1` recognizes chunks one after another on the calling thread.
    pub fn new(workers: usize, separator: Separator) -> Self {
        Self {
            workers: workers.max(1),
            separator,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Recognize every chunk exactly once and reduce the results.
    ///
    /// Returns `NoTranscriptProduced` when no chunk yields text, including
    /// the case of an empty chunk list.
    pub fn transcribe(
        &self,
        chunks: Vec<AudioChunk<'_>>,
        recognizer: &dyn RecognitionClient,
        locale: &str,
    ) -> Result<TranscriptionReport, TranscriptionError> {
        let chunk_count = chunks.len();
        tracing::info!(
            "Transcribing {} chunk(s) with {} ({} worker(s), locale {})",
            chunk_count,
            recognizer.name(),
            self.workers.min(chunk_count.max(1)),
            locale
        );

        let table = if self.workers <= 1 || chunk_count <= 1 {
            run_sequential(chunks, recognizer, locale)
        } else {
            run_parallel(chunks, recognizer, locale, self.workers)
        };

        self.reduce(table)
    }

    fn reduce(
        &self,
        table: Vec<Option<SegmentResult>>,
    ) -> Result<TranscriptionReport, TranscriptionError> {
        let chunk_count = table.len();
        let mut texts = Vec::new();
        let mut diagnostics = Vec::new();

        for (index, result) in table.into_iter().enumerate() {
            match result {
                Some(SegmentResult::Ok(text)) => texts.push(text),
                Some(SegmentResult::Unrecognized) => diagnostics.push(ChunkDiagnostic {
                    index,
                    severity: Severity::Warning,
                    message: "could not understand audio".to_string(),
                }),
                Some(SegmentResult::ServiceError(detail)) => diagnostics.push(ChunkDiagnostic {
                    index,
                    severity: Severity::Error,
                    message: format!("recognition service error: {}", detail),
                }),
                // Not produced by either run path: every claimed chunk reports,
                // and a worker panic propagates out of the thread scope.
                None => diagnostics.push(ChunkDiagnostic {
                    index,
                    severity: Severity::Error,
                    message: "no result was recorded".to_string(),
                }),
            }
        }

        if texts.is_empty() {
            tracing::error!(
                "No transcript produced: all {} chunk(s) degraded",
                chunk_count
            );
            return Err(TranscriptionError::NoTranscriptProduced { diagnostics });
        }

        let transcript = Transcript {
            segments: texts.len(),
            text: texts.join(self.separator.as_str()),
        };
        tracing::info!(
            "Transcript assembled: {}/{} chunk(s) recognized, {} word(s)",
            transcript.segments(),
            chunk_count,
            transcript.word_count()
        );

        Ok(TranscriptionReport {
            transcript,
            diagnostics,
            chunk_count,
        })
    }
}

/// Recognize one chunk and log its outcome. The chunk is dropped on return.
fn recognize_chunk(
    chunk: AudioChunk<'_>,
    recognizer: &dyn RecognitionClient,
    locale: &str,
) -> (usize, SegmentResult) {
    let index = chunk.index();
    let started = Instant::now();
    let result = SegmentResult::from(recognizer.recognize(&chunk, locale));

    match &result {
        SegmentResult::Ok(text) => tracing::debug!(
            "Chunk {} recognized in {:.1}s ({} chars)",
            chunk.number(),
            started.elapsed().as_secs_f64(),
            text.len()
        ),
        SegmentResult::Unrecognized => {
            tracing::warn!("Chunk {}: could not understand audio", chunk.number())
        }
        SegmentResult::ServiceError(detail) => {
            tracing::error!("Chunk {}: recognition service error: {}", chunk.number(), detail)
        }
    }

    (index, result)
}

fn run_sequential(
    chunks: Vec<AudioChunk<'_>>,
    recognizer: &dyn RecognitionClient,
    locale: &str,
) -> Vec<Option<SegmentResult>> {
    let mut table = vec![None; chunks.len()];
    for chunk in chunks {
        let (index, result) = recognize_chunk(chunk, recognizer, locale);
        table[index] = Some(result);
    }
    table
}

fn run_parallel(
    chunks: Vec<AudioChunk<'_>>,
    recognizer: &dyn RecognitionClient,
    locale: &str,
    workers: usize,
) -> Vec<Option<SegmentResult>> {
    let mut table = vec![None; chunks.len()];
    let workers = workers.min(chunks.len());
    let queue = Mutex::new(chunks.into_iter());
    let (sender, receiver) = mpsc::channel::<(usize, SegmentResult)>();

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let sender = sender.clone();
            let queue = &queue;
            let spawned = std::thread::Builder::new()
                .name(format!("recognize-{}", worker))
                .spawn_scoped(scope, move || loop {
                    // The lock is released before the recognition call.
                    let next = match queue.lock() {
                        Ok(mut chunks) => chunks.next(),
                        Err(_) => None,
                    };
                    let Some(chunk) = next else { break };
                    if sender.send(recognize_chunk(chunk, recognizer, locale)).is_err() {
                        break;
                    }
                });
            if let Err(e) = spawned {
                tracing::error!("Failed to spawn recognition worker {}: {}", worker, e);
            }
        }
        drop(sender);

        // Ends once every worker has finished and dropped its sender.
        for (index, result) in receiver {
            table[index] = Some(result);
        }
    });

    // If no worker could be spawned, fall back to the calling thread.
    let leftover: Vec<AudioChunk<'_>> = match queue.into_inner() {
        Ok(rest) => rest.collect(),
        Err(poisoned) => poisoned.into_inner().collect(),
    };
    for chunk in leftover {
        let (index, result) = recognize_chunk(chunk, recognizer, locale);
        table[index] = Some(result);
    }

    table
}
