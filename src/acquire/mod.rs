// Acquisition: turns a user-supplied source into a local WAV file.
//
// Downloaded media lives in a scratch TempDir owned by the AcquiredMedia, so
// it is reclaimed when the pipeline invocation that acquired it ends.

pub mod http;
pub mod local;
pub mod yt_dlp;

use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use url::Url;

use crate::audio::AudioAsset;
use crate::config::{AcquisitionConfig, Downloader};
use crate::error::AcquisitionError;

pub use http::HttpAcquirer;
pub use local::LocalFileAcquirer;
pub use yt_dlp::YtDlpAcquirer;

/// Where the audio comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(Url),
    File(PathBuf),
}

impl Source {
    /// `http`/`https` URLs are remote; anything else is treated as a path.
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Url(url),
            _ => Source::File(PathBuf::from(input)),
        }
    }

    /// Short, filesystem-safe name used to derive artifact keys.
    pub fn stem(&self) -> String {
        let raw = match self {
            Source::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            Source::Url(url) => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string())
                .or_else(|| {
                    url.path_segments()
                        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                        .map(|s| {
                            Path::new(s)
                                .file_stem()
                                .map(|st| st.to_string_lossy().to_string())
                                .unwrap_or_else(|| s.to_string())
                        })
                })
                .or_else(|| url.host_str().map(|h| h.to_string()))
                .unwrap_or_default(),
        };

        let cleaned: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            "source".to_string()
        } else {
            cleaned
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A local, decodable audio file plus the scratch space backing it (if any).
#[derive(Debug)]
pub struct AcquiredMedia {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl AcquiredMedia {
    /// A file the caller owns; nothing is cleaned up afterwards.
    pub fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            _scratch: None,
        }
    }

    /// A file inside `scratch`; the directory is deleted when this is dropped.
    pub fn in_scratch(path: PathBuf, scratch: TempDir) -> Self {
        Self {
            path,
            _scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn decode(&self) -> Result<AudioAsset, AcquisitionError> {
        AudioAsset::open(&self.path)
    }
}

/// Resolves a `Source` into an `AcquiredMedia`.
pub trait MediaAcquirer: Send {
    fn name(&self) -> &str;
    fn acquire(&self, source: &Source) -> Result<AcquiredMedia, AcquisitionError>;
}

pub(crate) fn scratch_dir() -> Result<TempDir, AcquisitionError> {
    Ok(tempfile::Builder::new().prefix("chunkscribe-").tempdir()?)
}

/// Routes files to the local acquirer and URLs to a downloader.
pub struct SourceRouter {
    local: LocalFileAcquirer,
    http: HttpAcquirer,
    yt_dlp: YtDlpAcquirer,
    downloader: Downloader,
}

impl SourceRouter {
    pub fn new(config: &AcquisitionConfig) -> anyhow::Result<Self> {
        Ok(Self {
            local: LocalFileAcquirer,
            http: HttpAcquirer::new(std::time::Duration::from_secs(
                config.download_timeout_secs,
            ))?,
            yt_dlp: YtDlpAcquirer::new(&config.yt_dlp_path),
            downloader: config.downloader,
        })
    }

    fn route(&self, source: &Source) -> &dyn MediaAcquirer {
        match (source, self.downloader) {
            (Source::File(_), _) => &self.local,
            (Source::Url(_), Downloader::Http) => &self.http,
            (Source::Url(_), Downloader::YtDlp) => &self.yt_dlp,
            (Source::Url(url), Downloader::Auto) => {
                if url.path().to_ascii_lowercase().ends_with(".wav") {
                    &self.http
                } else {
                    &self.yt_dlp
                }
            }
        }
    }
}

impl MediaAcquirer for SourceRouter {
    fn name(&self) -> &str {
        "router"
    }

    fn acquire(&self, source: &Source) -> Result<AcquiredMedia, AcquisitionError> {
        let acquirer = self.route(source);
        tracing::info!("Acquiring {} via {}", source, acquirer.name());
        acquirer.acquire(source)
    }
}
