use std::path::PathBuf;

use anyhow::Result;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::AudioChunk;
use crate::error::RecognitionError;
use crate::transcribe::backend::{language_code, RecognitionClient};

const WHISPER_SAMPLE_RATE: u32 = 16000;

pub struct WhisperLocalRecognizer {
    ctx: WhisperContext,
    threads: i32,
}

impl WhisperLocalRecognizer {
    pub fn new(model: &str) -> Result<Self> {
        let model_path = resolve_model_path(model);
        if !model_path.exists() {
            anyhow::bail!("Whisper model not found: {}", model_path.display());
        }
        let ctx = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to load Whisper model: {:?}", e))?;

        let threads = std::thread::available_parallelism()
            .map(|n| n.get().min(8) as i32)
            .unwrap_or(4);
        tracing::info!("Loaded Whisper model {}", model_path.display());
        Ok(Self { ctx, threads })
    }
}

/// A model name ("base") maps to `ggml-base.bin` in the models directory;
/// anything that looks like a path is used as-is.
fn resolve_model_path(model: &str) -> PathBuf {
    let as_path = PathBuf::from(model);
    if as_path.extension().map(|e| e == "bin").unwrap_or(false) {
        return as_path;
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chunkscribe")
        .join("models")
        .join(format!("ggml-{}.bin", model))
}

/// Linear-interpolation resampler; good enough for speech at 16 kHz.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).ceil() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

impl RecognitionClient for WhisperLocalRecognizer {
    fn name(&self) -> &str {
        "whisper-local"
    }

    fn recognize(&self, chunk: &AudioChunk<'_>, locale: &str) -> Result<String, RecognitionError> {
        let samples = resample_linear(&chunk.to_mono_f32(), chunk.sample_rate(), WHISPER_SAMPLE_RATE);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| RecognitionError::Service(format!("Failed to create state: {:?}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads);
        params.set_language(Some(language_code(locale)));
        params.set_print_progress(false);
        params.set_print_realtime(false);

        state
            .full(params, &samples)
            .map_err(|e| RecognitionError::Service(format!("Transcription failed: {:?}", e)))?;

        let mut text = String::new();
        let n_segments = state.full_n_segments();
        for i in 0..n_segments {
            if let Some(segment) = state.get_segment(i) {
                if let Ok(segment_text) = segment.to_str_lossy() {
                    text.push_str(&segment_text);
                    text.push(' ');
                }
            }
        }

        let text = text.trim();
        if text.is_empty() {
            Err(RecognitionError::Unrecognized)
        } else {
            Ok(text.to_string())
        }
    }
}
