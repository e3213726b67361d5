//! Audio and container stages: per-track transcoding and the final remux

pub mod audio_transcoder;
pub mod remuxer;

pub use audio_transcoder::AudioTranscoder;
pub use remuxer::Remuxer;
