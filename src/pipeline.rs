// Pipeline invocation: Acquirer -> Segmenter -> Orchestrator -> (optional) Sink.
//
// Acquisition, segmentation and total transcription failure abort the run.
// Persistence is attempted only after a transcript exists, and its failure is
// reported next to the transcript rather than in place of it.

use std::time::{Duration, Instant};

use chrono::Local;

use crate::acquire::{AcquiredMedia, MediaAcquirer, Source};
use crate::audio::segment;
use crate::error::{PipelineError, SinkError};
use crate::sink::ArtifactSink;
use crate::transcribe::backend::RecognitionClient;
use crate::transcribe::orchestrator::{Orchestrator, TranscriptionReport};

/// Result of trying to persist a run's artifacts.
#[derive(Debug)]
pub enum Persistence {
    /// No sink configured (or storing disabled for this run).
    Skipped,
    Stored { locations: Vec<String> },
    /// `stored` lists artifacts that made it before the failure.
    Failed { stored: Vec<String>, error: SinkError },
}

impl Persistence {
    pub fn is_failed(&self) -> bool {
        matches!(self, Persistence::Failed { .. })
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub source: String,
    /// Artifact key the transcript was (or would have been) stored under.
    pub key: String,
    pub audio_duration: Duration,
    pub elapsed: Duration,
    pub report: TranscriptionReport,
    pub persistence: Persistence,
}

pub struct Pipeline {
    acquirer: Box<dyn MediaAcquirer>,
    recognizer: Box<dyn RecognitionClient>,
    sink: Option<Box<dyn ArtifactSink>>,
    orchestrator: Orchestrator,
    store_source_audio: bool,
    key: Option<String>,
}

impl Pipeline {
    pub fn new(
        acquirer: Box<dyn MediaAcquirer>,
        recognizer: Box<dyn RecognitionClient>,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            acquirer,
            recognizer,
            sink: None,
            orchestrator,
            store_source_audio: false,
            key: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ArtifactSink>, store_source_audio: bool) -> Self {
        self.sink = Some(sink);
        self.store_source_audio = store_source_audio;
        self
    }

    /// Store artifacts under `key` instead of a name derived from the source.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn artifact_key(&self, source: &Source) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{}-{}", source.stem(), Local::now().format("%Y%m%d-%H%M%S")),
        }
    }

    pub fn run(
        &self,
        source: &Source,
        chunk_duration: Duration,
        locale: &str,
    ) -> Result<RunOutcome, PipelineError> {
        let started = Instant::now();

        // Scratch storage behind `media` lives until this function returns.
        let media = self.acquirer.acquire(source)?;
        let asset = media.decode()?;
        let audio_duration = asset.duration();
        tracing::info!(
            "Decoded {}: {:.1}s, {} Hz, {} channel(s)",
            source,
            audio_duration.as_secs_f64(),
            asset.sample_rate(),
            asset.channels()
        );

        // Chunks borrow from `asset`; samples are never copied.
        let chunks = segment(&asset, chunk_duration)?;
        let report = self
            .orchestrator
            .transcribe(chunks, self.recognizer.as_ref(), locale)?;
        drop(asset);

        let key = self.artifact_key(source);
        let persistence = self.persist(&key, &report, &media);

        Ok(RunOutcome {
            source: source.to_string(),
            key,
            audio_duration,
            elapsed: started.elapsed(),
            report,
            persistence,
        })
    }

    fn persist(
        &self,
        key: &str,
        report: &TranscriptionReport,
        media: &AcquiredMedia,
    ) -> Persistence {
        let Some(sink) = &self.sink else {
            return Persistence::Skipped;
        };

        let mut stored = Vec::new();
        let text_key = format!("{}.txt", key);
        match sink.put_text(&text_key, report.transcript.as_str()) {
            Ok(location) => stored.push(location),
            Err(error) => {
                tracing::error!("Failed to store transcript via {}: {}", sink.name(), error);
                return Persistence::Failed { stored, error };
            }
        }

        if self.store_source_audio {
            let audio_key = format!("{}.wav", key);
            match sink.put_file(&audio_key, media.path()) {
                Ok(location) => stored.push(location),
                Err(error) => {
                    tracing::error!("Failed to store source audio via {}: {}", sink.name(), error);
                    return Persistence::Failed { stored, error };
                }
            }
        }

        Persistence::Stored { locations: stored }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::LocalFileAcquirer;
    use crate::audio::AudioChunk;
    use crate::error::{AcquisitionError, RecognitionError, SegmentationError};
    use crate::sink::LocalDirSink;
    use crate::transcribe::orchestrator::Separator;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct EchoIndex {
        calls: Arc<AtomicUsize>,
    }

    impl RecognitionClient for EchoIndex {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, chunk: &AudioChunk<'_>, _locale: &str) -> Result<String, RecognitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("chunk{}", chunk.index()))
        }
    }

    fn write_wav(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..8000 * seconds {
            writer.write_sample((i % 64) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn pipeline(calls: Arc<AtomicUsize>) -> Pipeline {
        Pipeline::new(
            Box::new(LocalFileAcquirer),
            Box::new(EchoIndex { calls }),
            Orchestrator::new(1, Separator::Space),
        )
    }

    #[test]
    fn test_run_without_sink_skips_persistence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("talk.wav");
        write_wav(&path, 5);

        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = pipeline(calls.clone())
            .run(&Source::File(path), Duration::from_secs(2), "en-US")
            .unwrap();

        assert_eq!(outcome.report.transcript.as_str(), "chunk0 chunk1 chunk2");
        assert_eq!(outcome.audio_duration, Duration::from_secs(5));
        assert!(matches!(outcome.persistence, Persistence::Skipped));
        assert!(outcome.key.starts_with("talk-"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_run_stores_transcript_and_audio() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("talk.wav");
        write_wav(&path, 1);
        let out = tmp.path().join("out");

        let outcome = pipeline(Arc::new(AtomicUsize::new(0)))
            .with_sink(Box::new(LocalDirSink::new(out.clone())), true)
            .with_key("lecture")
            .run(&Source::File(path), Duration::from_secs(60), "en-US")
            .unwrap();

        match &outcome.persistence {
            Persistence::Stored { locations } => assert_eq!(locations.len(), 2),
            other => panic!("expected stored, got {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(out.join("lecture.txt")).unwrap(), "chunk0");
        assert!(out.join("lecture.wav").exists());
    }

    #[test]
    fn test_missing_source_fails_before_recognition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = pipeline(calls.clone()).run(
            &Source::parse("/nonexistent/talk.wav"),
            Duration::from_secs(60),
            "en-US",
        );
        assert!(matches!(
            result,
            Err(PipelineError::Acquisition(AcquisitionError::NotFound(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_chunk_duration_fails_before_recognition() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("talk.wav");
        write_wav(&path, 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let result = pipeline(calls.clone()).run(&Source::File(path), Duration::ZERO, "en-US");
        assert!(matches!(
            result,
            Err(PipelineError::Segmentation(
                SegmentationError::InvalidChunkDuration(_)
            ))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_audio_is_total_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("silence.wav");
        write_wav(&path, 0);

        let result = pipeline(Arc::new(AtomicUsize::new(0))).run(
            &Source::File(path),
            Duration::from_secs(60),
            "en-US",
        );
        assert!(matches!(result, Err(PipelineError::Transcription(_))));
    }
}
