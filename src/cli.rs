use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chunkscribe",
    version,
    about = "Transcribe remote media or local audio files in fixed-length chunks"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a media URL or a local WAV file
    Transcribe(TranscribeArgs),

    /// Show recent transcription runs
    History {
        /// Number of most recent runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Write a documented default config file
    InitConfig {
        /// Destination (defaults to the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TranscribeArgs {
    /// http(s) URL or path to a WAV file
    pub source: String,

    /// Chunk length in seconds (overrides [segmenter] chunk_duration_secs)
    #[arg(long)]
    pub chunk_secs: Option<u64>,

    /// Spoken language, e.g. en-US (overrides [recognition] locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Force a specific backend (azure or whisper)
    #[arg(long)]
    pub backend: Option<String>,

    /// Chunks recognized in parallel (overrides [recognition] workers)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Artifact name to store the transcript under (without extension)
    #[arg(long)]
    pub key: Option<String>,

    /// Do not persist artifacts for this run
    #[arg(long)]
    pub no_store: bool,

    /// Write the transcript to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
