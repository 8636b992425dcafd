use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::acquire::{Source, SourceRouter};
use crate::cli::TranscribeArgs;
use crate::config::{Config, RecognitionConfig, SinkConfig, SinkKind};
use crate::error::{PipelineError, TranscriptionError};
use crate::history::{self, RunRecord};
use crate::pipeline::{Persistence, Pipeline, RunOutcome};
use crate::sink::{ArtifactSink, LocalDirSink, S3Sink};
use crate::transcribe::backend::RecognitionClient;
use crate::transcribe::orchestrator::Orchestrator;

const SINK_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the recognition backend from config.
pub fn build_recognizer(
    config: &RecognitionConfig,
    backend_override: Option<&str>,
) -> Result<Box<dyn RecognitionClient>> {
    let backend_name = backend_override.unwrap_or(&config.backend);

    match backend_name {
        "azure" => {
            use crate::transcribe::azure_openai::AzureOpenAiRecognizer;
            Ok(Box::new(AzureOpenAiRecognizer::new(config)?))
        }
        "whisper" => {
            #[cfg(feature = "whisper")]
            {
                use crate::transcribe::whisper_local::WhisperLocalRecognizer;
                Ok(Box::new(WhisperLocalRecognizer::new(&config.model)?))
            }
            #[cfg(not(feature = "whisper"))]
            {
                anyhow::bail!("Local whisper backend requires building with --features whisper")
            }
        }
        other => anyhow::bail!("Unknown recognition backend: {}", other),
    }
}

/// Build the configured artifact sink, or `None` when storage is disabled.
pub fn build_sink(config: &SinkConfig) -> Result<Option<Box<dyn ArtifactSink>>> {
    match config.kind {
        SinkKind::None => Ok(None),
        SinkKind::Local => Ok(Some(Box::new(LocalDirSink::new(config.directory.clone())))),
        SinkKind::S3 => Ok(Some(Box::new(S3Sink::new(&config.s3, SINK_TIMEOUT)?))),
    }
}

/// Run one transcription from the command line.
pub fn run_transcribe(config: &Config, args: &TranscribeArgs) -> Result<()> {
    let chunk_duration = args
        .chunk_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.segmenter.chunk_duration());
    let locale = args
        .locale
        .clone()
        .unwrap_or_else(|| config.recognition.locale.clone());
    let workers = args.workers.unwrap_or(config.recognition.workers);

    let source = Source::parse(&args.source);
    let acquirer = SourceRouter::new(&config.acquisition)?;
    let recognizer = build_recognizer(&config.recognition, args.backend.as_deref())?;
    let orchestrator = Orchestrator::new(workers, config.segmenter.separator);

    let mut pipeline = Pipeline::new(Box::new(acquirer), recognizer, orchestrator);
    if !args.no_store {
        if let Some(sink) = build_sink(&config.sink)? {
            pipeline = pipeline.with_sink(sink, config.sink.upload_source_audio);
        }
    }
    if let Some(key) = &args.key {
        pipeline = pipeline.with_key(key.clone());
    }

    let result = pipeline.run(&source, chunk_duration, &locale);

    if config.history.enabled {
        let record = match &result {
            Ok(outcome) => RunRecord::from_outcome(outcome),
            Err(e) => RunRecord::from_error(&source.to_string(), e),
        };
        if let Err(e) = history::append(&config.history.directory, &record) {
            tracing::warn!("Failed to record run history: {:#}", e);
        }
    }

    match result {
        Ok(outcome) => report_outcome(&outcome, args.output.as_deref()),
        Err(e) => {
            if let PipelineError::Transcription(TranscriptionError::NoTranscriptProduced {
                diagnostics,
            }) = &e
            {
                for diagnostic in diagnostics {
                    eprintln!("{}", diagnostic);
                }
            }
            Err(e).with_context(|| format!("Transcription of {} failed", source))
        }
    }
}

fn report_outcome(outcome: &RunOutcome, output: Option<&Path>) -> Result<()> {
    let report = &outcome.report;
    for diagnostic in &report.diagnostics {
        eprintln!("{}", diagnostic);
    }

    let delivered = deliver_transcript(report.transcript.as_str(), output);

    eprintln!(
        "Transcribed {:.1}s of audio in {:.1}s: {}/{} chunk(s) recognized, {} word(s)",
        outcome.audio_duration.as_secs_f64(),
        outcome.elapsed.as_secs_f64(),
        report.recognized_count(),
        report.chunk_count,
        report.transcript.word_count()
    );

    match &outcome.persistence {
        Persistence::Skipped => {}
        Persistence::Stored { locations } => {
            for location in locations {
                eprintln!("Saved: {}", location);
            }
        }
        Persistence::Failed { stored, error } => {
            for location in stored {
                eprintln!("Saved: {}", location);
            }
            eprintln!("warning: artifacts not fully stored: {}", error);
        }
    }

    delivered
}

/// Write the transcript to `output`, or stdout when none is given.
///
/// If the file cannot be written the transcript still goes to stdout before
/// the error is returned.
fn deliver_transcript(text: &str, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        println!("{}", text);
        return Ok(());
    };

    match std::fs::write(path, text) {
        Ok(()) => {
            eprintln!("Transcript written to {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("{}", text);
            Err(e).with_context(|| {
                format!(
                    "Failed to write {} (transcript printed to stdout instead)",
                    path.display()
                )
            })
        }
    }
}

/// Print the most recent runs.
pub fn show_history(history_dir: &Path, limit: usize) -> Result<()> {
    let records = history::load(history_dir)?;
    if records.is_empty() {
        println!("No runs recorded in {}", history::history_path(history_dir).display());
        return Ok(());
    }

    let skip = records.len().saturating_sub(limit);
    println!("chunkscribe history ({} of {} runs):", records.len() - skip, records.len());
    for record in &records[skip..] {
        let audio = record
            .audio_secs
            .map(|s| format!("{:>7.1}s", s))
            .unwrap_or_else(|| "       -".to_string());
        println!(
            "  {}  {:<8}  {}  {}/{} chunks  {}",
            record.timestamp, record.status, audio, record.recognized, record.chunks, record.source
        );
        if let Some(error) = &record.error {
            println!("      {}", error);
        }
    }
    Ok(())
}

/// Write the commented default config.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::platform_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine platform config directory"))?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, Config::generate_default_commented())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}
