// Decoded audio asset: the immutable input to segmentation.
//
// Samples are held as interleaved 16-bit PCM regardless of the source WAV's
// sample format, so every chunk can be re-encoded losslessly for backends
// that want file input.

use std::path::Path;
use std::time::Duration;

use hound::SampleFormat;

use crate::error::{AcquisitionError, SegmentationError};

#[derive(Debug, Clone)]
pub struct AudioAsset {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioAsset {
    /// Build an asset from interleaved samples.
    pub fn new(
        samples: Vec<i16>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, SegmentationError> {
        if sample_rate == 0 {
            return Err(SegmentationError::MalformedAsset(
                "sample rate is zero".to_string(),
            ));
        }
        if channels == 0 {
            return Err(SegmentationError::MalformedAsset(
                "channel count is zero".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(SegmentationError::MalformedAsset(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Decode a WAV file into an asset.
    pub fn open(path: &Path) -> Result<Self, AcquisitionError> {
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AcquisitionError::NotFound(path.to_path_buf())
            }
            hound::Error::IoError(io) => AcquisitionError::Io(io),
            other => AcquisitionError::UnsupportedFormat(format!("{}: {}", path.display(), other)),
        })?;
        let spec = reader.spec();

        let decoded: Result<Vec<i16>, hound::Error> = match (spec.sample_format, spec.bits_per_sample)
        {
            (SampleFormat::Int, bits) if bits <= 16 => {
                let shift = 16 - bits;
                reader
                    .into_samples::<i16>()
                    .map(|s| s.map(|v| v << shift))
                    .collect()
            }
            (SampleFormat::Int, bits) if bits <= 32 => {
                let shift = bits - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect()
            }
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect(),
            (format, bits) => {
                return Err(AcquisitionError::UnsupportedFormat(format!(
                    "{}: {:?} samples at {} bits",
                    path.display(),
                    format,
                    bits
                )))
            }
        };

        let samples = decoded.map_err(|e| {
            AcquisitionError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        })?;

        Self::new(samples, spec.sample_rate, spec.channels)
            .map_err(|e| AcquisitionError::UnsupportedFormat(e.to_string()))
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frames(), self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert a frame count to a `Duration` without going through floating point.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    let rate = sample_rate as u64;
    let secs = frames / rate;
    let nanos = (frames % rate) * 1_000_000_000 / rate;
    Duration::new(secs, nanos as u32)
}
