use std::time::Duration;

use anyhow::Result;

use crate::acquire::{scratch_dir, AcquiredMedia, MediaAcquirer, Source};
use crate::error::AcquisitionError;

/// Downloads a directly linked audio file into scratch space.
pub struct HttpAcquirer {
    client: reqwest::blocking::Client,
}

impl HttpAcquirer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chunkscribe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn map_send_error(url: &url::Url, e: reqwest::Error) -> AcquisitionError {
    if e.is_connect() || e.is_timeout() {
        AcquisitionError::Unreachable(format!("{}: {}", url, e))
    } else {
        AcquisitionError::Download(format!("{}: {}", url, e))
    }
}

impl MediaAcquirer for HttpAcquirer {
    fn name(&self) -> &str {
        "http"
    }

    fn acquire(&self, source: &Source) -> Result<AcquiredMedia, AcquisitionError> {
        let url = match source {
            Source::Url(url) => url,
            Source::File(path) => {
                return Err(AcquisitionError::Download(format!(
                    "{} is not a URL",
                    path.display()
                )))
            }
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Download(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let scratch = scratch_dir()?;
        let path = scratch.path().join(format!("{}.wav", source.stem()));
        let mut file = std::fs::File::create(&path)?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|e| AcquisitionError::Download(format!("{}: {}", url, e)))?;

        tracing::info!("Downloaded {} ({:.1} MB)", url, bytes as f64 / 1_048_576.0);
        Ok(AcquiredMedia::in_scratch(path, scratch))
    }
}
