// Segmenter: slices an AudioAsset into fixed-duration, index-ordered chunks.
//
// Chunk `i` starts at frame `floor(i * chunk_duration * sample_rate)`, measured
// from the start of the asset rather than by repeated strides, so rounding
// never accumulates. The chunk count is `ceil(asset.duration / chunk_duration)`
// and the chunks' frames and durations both sum exactly to the asset's.
// The trailing chunk keeps whatever remainder is left; it is never padded.
// Chunks borrow their samples from the asset.

use std::io::BufWriter;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::NamedTempFile;

use crate::audio::asset::{frames_to_duration, AudioAsset};
use crate::error::SegmentationError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A contiguous, non-overlapping slice of an asset.
#[derive(Debug, Clone)]
pub struct AudioChunk<'a> {
    index: usize,
    start_frame: u64,
    frames: u64,
    sample_rate: u32,
    channels: u16,
    samples: &'a [i16],
}

impl<'a> AudioChunk<'a> {
    /// 0-based position; the only ordering key used downstream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based chunk number for user-facing messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn start_offset(&self) -> Duration {
        frames_to_duration(self.start_frame, self.sample_rate)
    }

    /// Measured between the chunk's boundaries on the asset timeline, so
    /// consecutive chunk durations add up to the asset's duration.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.start_frame + self.frames, self.sample_rate) - self.start_offset()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &'a [i16] {
        self.samples
    }

    /// Average all channels into one and normalize to [-1.0, 1.0].
    pub fn to_mono_f32(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
                sum / channels as f32
            })
            .collect()
    }

    /// Encode the chunk as a 16-bit WAV in a temporary file.
    ///
    /// The file is removed when the returned guard is dropped, so callers
    /// hold it only for the duration of one recognition call.
    pub fn write_temp_wav(&self) -> Result<NamedTempFile, hound::Error> {
        let file = tempfile::Builder::new()
            .prefix(&format!("chunk-{:04}-", self.index))
            .suffix(".wav")
            .tempfile()?;

        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::new(BufWriter::new(file.as_file()), spec)?;
        for &sample in self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        Ok(file)
    }
}

/// First frame of chunk `index`, rounded down.
fn boundary(index: u64, chunk_nanos: u128, sample_rate: u32) -> u64 {
    let frame = index as u128 * chunk_nanos * sample_rate as u128 / NANOS_PER_SEC;
    u64::try_from(frame).unwrap_or(u64::MAX)
}

/// Split `asset` into chunks of `chunk_duration`.
///
/// Returns an empty list for a zero-length asset. Fails when the chunk
/// duration is shorter than a single frame.
pub fn segment(
    asset: &AudioAsset,
    chunk_duration: Duration,
) -> Result<Vec<AudioChunk<'_>>, SegmentationError> {
    let sample_rate = asset.sample_rate();
    let chunk_nanos = chunk_duration.as_nanos();
    // Chunk length in billionths of a frame. Any Duration times any u32 rate
    // fits in u128.
    let chunk_frame_nanos = chunk_nanos * sample_rate as u128;
    if chunk_frame_nanos < NANOS_PER_SEC {
        return Err(SegmentationError::InvalidChunkDuration(chunk_duration));
    }

    let total = asset.frames();
    let channels = asset.channels() as usize;
    let samples = asset.samples();

    // Every chunk spans at least one frame, so the count never exceeds `total`.
    let count = (total as u128 * NANOS_PER_SEC).div_ceil(chunk_frame_nanos);
    let count = usize::try_from(count).unwrap_or(usize::MAX);

    let mut chunks = Vec::with_capacity(count);
    for index in 0..count {
        let start = boundary(index as u64, chunk_nanos, sample_rate);
        let end = if index + 1 == count {
            total
        } else {
            boundary(index as u64 + 1, chunk_nanos, sample_rate)
        };
        chunks.push(AudioChunk {
            index,
            start_frame: start,
            frames: end - start,
            sample_rate,
            channels: asset.channels(),
            samples: &samples[start as usize * channels..end as usize * channels],
        });
    }

    tracing::debug!(
        "Segmented {:.1}s of audio into {} chunk(s) of up to {:?}",
        asset.duration().as_secs_f64(),
        chunks.len(),
        chunk_duration
    );

    Ok(chunks)
}
