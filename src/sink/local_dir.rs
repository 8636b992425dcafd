use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::sink::{validate_key, ArtifactSink};

/// Stores artifacts as files under a root directory.
#[derive(Debug)]
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn target(&self, key: &str) -> Result<PathBuf, SinkError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

impl ArtifactSink for LocalDirSink {
    fn name(&self) -> &str {
        "local"
    }

    fn put_bytes(&self, key: &str, body: &[u8], _content_type: &str) -> Result<String, SinkError> {
        let path = self.target(key)?;
        std::fs::write(&path, body)?;
        tracing::info!("Saved {} ({} bytes)", path.display(), body.len());
        Ok(path.display().to_string())
    }

    fn put_file(&self, key: &str, source: &Path) -> Result<String, SinkError> {
        let path = self.target(key)?;
        let bytes = std::fs::copy(source, &path)?;
        tracing::info!("Saved {} ({} bytes)", path.display(), bytes);
        Ok(path.display().to_string())
    }
}
