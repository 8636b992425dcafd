use std::process::Command;

use crate::acquire::{scratch_dir, AcquiredMedia, MediaAcquirer, Source};
use crate::error::AcquisitionError;

/// Extracts the audio track of a hosted video with yt-dlp, as 16 kHz mono WAV.
///
/// Requires `yt-dlp` and `ffmpeg` on the host.
#[derive(Debug)]
pub struct YtDlpAcquirer {
    program: String,
}

impl YtDlpAcquirer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl MediaAcquirer for YtDlpAcquirer {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn acquire(&self, source: &Source) -> Result<AcquiredMedia, AcquisitionError> {
        let url = match source {
            Source::Url(url) => url,
            Source::File(path) => {
                return Err(AcquisitionError::Tool(format!(
                    "yt-dlp needs a URL, got {}",
                    path.display()
                )))
            }
        };

        let scratch = scratch_dir()?;
        let template = scratch.path().join("source.%(ext)s");

        let output = Command::new(&self.program)
            .args([
                "--quiet",
                "--no-warnings",
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "-x",
                "--audio-format",
                "wav",
                "--postprocessor-args",
                "ffmpeg:-ar 16000 -ac 1",
                "-o",
            ])
            .arg(&template)
            .arg(url.as_str())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AcquisitionError::Tool(format!("{} not found on PATH", self.program))
                } else {
                    AcquisitionError::Tool(format!("failed to run {}: {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquisitionError::Tool(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let path = scratch.path().join("source.wav");
        if !path.is_file() {
            return Err(AcquisitionError::Tool(format!(
                "{} produced no WAV output for {}",
                self.program, url
            )));
        }

        tracing::info!("Extracted audio from {}", url);
        Ok(AcquiredMedia::in_scratch(path, scratch))
    }
}
