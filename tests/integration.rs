use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chunkscribe::acquire::{LocalFileAcquirer, Source};
use chunkscribe::audio::AudioChunk;
use chunkscribe::error::{PipelineError, RecognitionError, SinkError, TranscriptionError};
use chunkscribe::history::{self, RunRecord, RunStatus};
use chunkscribe::pipeline::{Persistence, Pipeline};
use chunkscribe::sink::ArtifactSink;
use chunkscribe::transcribe::backend::RecognitionClient;
use chunkscribe::transcribe::orchestrator::{Orchestrator, Separator, Severity};
use tempfile::TempDir;

const RATE: u32 = 8000;

/// Writes a mono 16-bit WAV where every sample of second `n` equals `n`.
fn write_numbered_wav(path: &Path, seconds: u32, extra_frames: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for second in 0..seconds {
        for _ in 0..RATE {
            writer.write_sample(second as i16).unwrap();
        }
    }
    for _ in 0..extra_frames {
        writer.write_sample(seconds as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Names each chunk after the first sample it sees, sleeping longer for early
/// chunks so parallel completion order is reversed.
struct FirstSampleRecognizer {
    silent: Vec<usize>,
    failing: Vec<usize>,
    calls: Arc<AtomicUsize>,
}

impl FirstSampleRecognizer {
    fn new() -> Self {
        Self {
            silent: Vec::new(),
            failing: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RecognitionClient for FirstSampleRecognizer {
    fn name(&self) -> &str {
        "first-sample"
    }

    fn recognize(&self, chunk: &AudioChunk<'_>, _locale: &str) -> Result<String, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5 * (6 - chunk.index().min(5)) as u64));
        if self.failing.contains(&chunk.index()) {
            return Err(RecognitionError::Service("HTTP 503".to_string()));
        }
        if self.silent.contains(&chunk.index()) {
            return Err(RecognitionError::Unrecognized);
        }
        Ok(format!("s{}", chunk.samples()[0]))
    }
}

struct BrokenSink;

impl ArtifactSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn put_bytes(&self, _key: &str, _body: &[u8], _content_type: &str) -> Result<String, SinkError> {
        Err(SinkError::Unavailable("connection refused".to_string()))
    }
}

fn pipeline(recognizer: FirstSampleRecognizer, workers: usize) -> Pipeline {
    Pipeline::new(
        Box::new(LocalFileAcquirer),
        Box::new(recognizer),
        Orchestrator::new(workers, Separator::Space),
    )
}

#[test]
fn test_local_file_end_to_end_in_order() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("lecture.wav");
    // 5 whole seconds plus half a second of remainder
    write_numbered_wav(&path, 5, RATE / 2);

    let outcome = pipeline(FirstSampleRecognizer::new(), 1)
        .run(&Source::File(path), Duration::from_secs(2), "en-US")
        .unwrap();

    assert_eq!(outcome.report.chunk_count, 3);
    assert_eq!(outcome.report.transcript.as_str(), "s0 s2 s4");
    assert_eq!(outcome.audio_duration, Duration::from_millis(5500));
    assert!(!outcome.report.is_degraded());
}

#[test]
fn test_parallel_matches_sequential() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("talk.wav");
    write_numbered_wav(&path, 7, 0);
    let source = Source::File(path);

    let sequential = pipeline(FirstSampleRecognizer::new(), 1)
        .run(&source, Duration::from_secs(1), "en-US")
        .unwrap();
    let parallel = pipeline(FirstSampleRecognizer::new(), 4)
        .run(&source, Duration::from_secs(1), "en-US")
        .unwrap();

    assert_eq!(
        sequential.report.transcript.as_str(),
        parallel.report.transcript.as_str()
    );
    assert_eq!(parallel.report.transcript.as_str(), "s0 s1 s2 s3 s4 s5 s6");
}

#[test]
fn test_partial_failures_are_reported_per_chunk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("talk.wav");
    write_numbered_wav(&path, 4, 0);

    let mut recognizer = FirstSampleRecognizer::new();
    recognizer.silent = vec![1];
    recognizer.failing = vec![2];

    let outcome = pipeline(recognizer, 2)
        .run(&Source::File(path), Duration::from_secs(1), "en-US")
        .unwrap();

    let report = &outcome.report;
    assert_eq!(report.transcript.as_str(), "s0 s3");
    assert!(report.is_degraded());
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.diagnostics[0].chunk_number(), 2);
    assert_eq!(report.diagnostics[0].severity, Severity::Warning);
    assert_eq!(report.diagnostics[1].chunk_number(), 3);
    assert_eq!(report.diagnostics[1].severity, Severity::Error);
    assert!(report.diagnostics[1].message.contains("HTTP 503"));
}

#[test]
fn test_all_chunks_failing_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("talk.wav");
    write_numbered_wav(&path, 2, 0);

    let mut recognizer = FirstSampleRecognizer::new();
    recognizer.failing = vec![0, 1];

    let result = pipeline(recognizer, 1).run(&Source::File(path), Duration::from_secs(1), "en-US");
    match result {
        Err(PipelineError::Transcription(TranscriptionError::NoTranscriptProduced {
            diagnostics,
        })) => assert_eq!(diagnostics.len(), 2),
        other => panic!("expected total failure, got {:?}", other.map(|o| o.key)),
    }
}

#[test]
fn test_sink_failure_keeps_transcript() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("talk.wav");
    write_numbered_wav(&path, 1, 0);

    let outcome = pipeline(FirstSampleRecognizer::new(), 1)
        .with_sink(Box::new(BrokenSink), true)
        .run(&Source::File(path), Duration::from_secs(60), "en-US")
        .unwrap();

    assert_eq!(outcome.report.transcript.as_str(), "s0");
    match &outcome.persistence {
        Persistence::Failed { stored, error } => {
            assert!(stored.is_empty());
            assert!(matches!(error, SinkError::Unavailable(_)));
        }
        other => panic!("expected persistence failure, got {:?}", other),
    }

    let record = RunRecord::from_outcome(&outcome);
    assert_eq!(record.status, RunStatus::Complete);
    assert!(record.error.unwrap().contains("persistence failed"));
}

#[test]
fn test_history_roundtrip_after_run() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("talk.wav");
    write_numbered_wav(&path, 3, 0);
    let history_dir = tmp.path().join("history");

    let recognizer = FirstSampleRecognizer::new();
    let calls = recognizer.calls.clone();
    let outcome = pipeline(recognizer, 2)
        .run(&Source::File(path), Duration::from_secs(1), "en-US")
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    history::append(&history_dir, &RunRecord::from_outcome(&outcome)).unwrap();
    let missing = Source::parse("/nonexistent/gone.wav");
    let failure = pipeline(FirstSampleRecognizer::new(), 1)
        .run(&missing, Duration::from_secs(1), "en-US")
        .unwrap_err();
    history::append(
        &history_dir,
        &RunRecord::from_error(&missing.to_string(), &failure),
    )
    .unwrap();

    let records = history::load(&history_dir).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].chunks, 3);
    assert_eq!(records[0].words, 3);
    assert_eq!(records[1].status, RunStatus::Failed);
}
