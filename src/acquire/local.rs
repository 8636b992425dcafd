use crate::acquire::{AcquiredMedia, MediaAcquirer, Source};
use crate::error::AcquisitionError;

/// Uses an uploaded/local file in place.
#[derive(Debug, Default)]
pub struct LocalFileAcquirer;

impl MediaAcquirer for LocalFileAcquirer {
    fn name(&self) -> &str {
        "local"
    }

    fn acquire(&self, source: &Source) -> Result<AcquiredMedia, AcquisitionError> {
        let path = match source {
            Source::File(path) => path,
            Source::Url(url) => {
                return Err(AcquisitionError::Unreachable(format!(
                    "{} is a URL, not a local file",
                    url
                )))
            }
        };
        if !path.is_file() {
            return Err(AcquisitionError::NotFound(path.clone()));
        }
        Ok(AcquiredMedia::borrowed(path.clone()))
    }
}
