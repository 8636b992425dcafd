use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transcribe::orchestrator::Separator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmenter: SegmenterConfig,
    pub recognition: RecognitionConfig,
    pub acquisition: AcquisitionConfig,
    pub sink: SinkConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub chunk_duration_secs: u64,
    pub separator: Separator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub backend: String,
    pub locale: String,
    pub workers: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub model: String,
    pub azure: AzureConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Downloader {
    /// Plain HTTP for direct `.wav` links, yt-dlp for everything else.
    Auto,
    Http,
    YtDlp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub downloader: Downloader,
    pub yt_dlp_path: String,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    None,
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub upload_source_audio: bool,
    pub directory: PathBuf,
    pub s3: S3Config,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Override for S3-compatible services. Empty means AWS.
    pub endpoint: String,
    pub prefix: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            recognition: RecognitionConfig::default(),
            acquisition: AcquisitionConfig::default(),
            sink: SinkConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_duration_secs: 60,
            separator: Separator::Space,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            backend: "azure".to_string(),
            locale: "en-US".to_string(),
            workers: 1,
            request_timeout_secs: 120,
            max_retries: 2,
            model: "base".to_string(),
            azure: AzureConfig::default(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            downloader: Downloader::Auto,
            yt_dlp_path: "yt-dlp".to_string(),
            download_timeout_secs: 600,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Local,
            upload_source_audio: false,
            directory: data_dir().join("transcripts"),
            s3: S3Config::default(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: String::new(),
            prefix: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: data_dir(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chunkscribe")
}

impl SegmenterConfig {
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs(self.chunk_duration_secs)
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("chunkscribe.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/chunkscribe/config.toml)
        if let Some(platform_config) = Self::platform_path() {
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Where `init-config` writes when no path is given.
    pub fn platform_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("chunkscribe").join("config.toml"))
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let defaults = Config::default();
        let sink_dir = defaults.sink.directory.to_string_lossy().replace('\\', "\\\\");
        let history_dir = defaults
            .history
            .directory
            .to_string_lossy()
            .replace('\\', "\\\\");

        format!(
r#"# chunkscribe configuration

[segmenter]
# Length of each audio chunk sent to the recognizer, in seconds.
# The final chunk may be shorter; it is never padded.
chunk_duration_secs = 60
# How recognized chunks are joined: "space" or "newline".
separator = "space"

[recognition]
# Recognition backend: "azure" (Azure OpenAI Whisper API) or "whisper"
# (local whisper.cpp, requires building with --features whisper).
backend = "azure"
# Spoken language of the source audio (BCP-47 tag).
locale = "en-US"
# Number of chunks recognized in parallel. 1 = sequential.
workers = 1
# Per-chunk request timeout. A timed-out chunk is reported as a service error.
request_timeout_secs = 120
# Retries per chunk on throttling, server errors, or dropped connections.
max_retries = 2
# Whisper model name for the local backend (tiny, base, small, medium, large-v3)
# or an absolute path to a ggml .bin model file.
model = "base"

[recognition.azure]
# Azure OpenAI endpoint URL.
# endpoint = "https://your-resource.openai.azure.com"
# API key (or set CHUNKSCRIBE_AZURE_KEY environment variable).
# api_key = ""
# Deployment name for the Whisper model.
# deployment = "whisper"

[acquisition]
# How URLs are fetched: "auto", "http" (direct WAV download) or "yt-dlp".
downloader = "auto"
# yt-dlp executable (must be on PATH, with ffmpeg available for extraction).
yt_dlp_path = "yt-dlp"
# Maximum time allowed for a download.
download_timeout_secs = 600

[sink]
# Where transcripts are stored: "none", "local" or "s3".
kind = "local"
# Also store the acquired source audio next to the transcript.
upload_source_audio = false
# Root directory for the local sink.
directory = "{sink_dir}"

[sink.s3]
# bucket = "my-transcripts"
region = "us-east-1"
# Override for S3-compatible services (MinIO, R2, ...). Leave empty for AWS.
# endpoint = "http://localhost:9000"
# Key prefix, e.g. "transcripts/".
# prefix = ""
# Credentials (or set AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY).
# access_key_id = ""
# secret_access_key = ""

[history]
# Record each run in history.jsonl (shown by 'chunkscribe history').
enabled = true
directory = "{history_dir}"
"#,
            sink_dir = sink_dir,
            history_dir = history_dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.segmenter.chunk_duration_secs, 60);
        assert_eq!(config.segmenter.separator, Separator::Space);
        assert_eq!(config.recognition.backend, "azure");
        assert_eq!(config.recognition.locale, "en-US");
        assert_eq!(config.recognition.workers, 1);
        assert_eq!(config.recognition.max_retries, 2);
        assert_eq!(config.acquisition.downloader, Downloader::Auto);
        assert_eq!(config.sink.kind, SinkKind::Local);
        assert!(!config.sink.upload_source_audio);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_str = r#"
            [segmenter]
            chunk_duration_secs = 30

            [recognition]
            workers = 4
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.segmenter.chunk_duration(), Duration::from_secs(30));
        assert_eq!(config.recognition.workers, 4);
        // Defaults still applied for unspecified fields
        assert_eq!(config.segmenter.separator, Separator::Space);
        assert_eq!(config.recognition.locale, "en-US");
        assert_eq!(config.sink.kind, SinkKind::Local);
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_str = r#"
            [segmenter]
            chunk_duration_secs = 45
            separator = "newline"

            [recognition]
            backend = "whisper"
            locale = "tr-TR"
            workers = 3
            request_timeout_secs = 30
            max_retries = 0
            model = "small"

            [recognition.azure]
            endpoint = "https://example.openai.azure.com"
            api_key = "test-key"
            deployment = "whisper-large"

            [acquisition]
            downloader = "yt-dlp"
            yt_dlp_path = "/usr/local/bin/yt-dlp"
            download_timeout_secs = 60

            [sink]
            kind = "s3"
            upload_source_audio = true
            directory = "/tmp/chunkscribe"

            [sink.s3]
            bucket = "erman-demo-1"
            region = "eu-central-1"
            prefix = "transcripts/"

            [history]
            enabled = false
            directory = "/tmp/chunkscribe-history"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.segmenter.separator, Separator::Newline);
        assert_eq!(config.recognition.backend, "whisper");
        assert_eq!(config.recognition.locale, "tr-TR");
        assert_eq!(config.recognition.max_retries, 0);
        assert_eq!(config.recognition.azure.deployment, "whisper-large");
        assert_eq!(config.acquisition.downloader, Downloader::YtDlp);
        assert_eq!(config.sink.kind, SinkKind::S3);
        assert!(config.sink.upload_source_audio);
        assert_eq!(config.sink.s3.bucket, "erman-demo-1");
        assert_eq!(config.sink.s3.region, "eu-central-1");
        assert!(!config.history.enabled);
    }

    #[test]
    fn test_unknown_sink_kind_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[sink]\nkind = \"ftp\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_nonexistent_path_errors() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_path_returns_resolved_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config_file = tmp.path().join("chunkscribe.toml");
        std::fs::write(&config_file, "[recognition]\nlocale = \"de-DE\"\n").unwrap();

        let (config, resolved) = Config::load_with_path(Some(config_file.as_path())).unwrap();
        assert_eq!(config.recognition.locale, "de-DE");
        assert_eq!(resolved, Some(config_file));
    }

    #[test]
    fn test_generate_default_commented_is_valid_toml() {
        let content = Config::generate_default_commented();
        let config: Config = toml::from_str(&content).unwrap();
        let defaults = Config::default();
        assert_eq!(config.segmenter.chunk_duration_secs, 60);
        assert_eq!(config.recognition.backend, "azure");
        assert_eq!(config.acquisition.downloader, Downloader::Auto);
        assert_eq!(config.sink.kind, SinkKind::Local);
        assert_eq!(config.sink.directory, defaults.sink.directory);
        assert_eq!(config.history.directory, defaults.history.directory);
    }

    #[test]
    fn test_generate_default_commented_has_all_sections() {
        let content = Config::generate_default_commented();
        for section in [
            "[segmenter]",
            "[recognition]",
            "[recognition.azure]",
            "[acquisition]",
            "[sink]",
            "[sink.s3]",
            "[history]",
        ] {
            assert!(content.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let mut config = Config::default();
        config.recognition.azure.api_key = "azure-secret-12345".to_string();
        config.sink.s3.secret_access_key = "s3-secret-67890".to_string();
        config.sink.s3.access_key_id = "AKIDEXAMPLE".to_string();
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("azure-secret-12345"));
        assert!(!debug_output.contains("s3-secret-67890"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("AKIDEXAMPLE"));
    }
}
