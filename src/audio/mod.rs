pub mod asset;
pub mod segmenter;

pub use asset::AudioAsset;
pub use segmenter::{segment, AudioChunk};
