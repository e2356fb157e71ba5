//! Audio plumbing for the narration pipeline.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner
//! - MP3 <-> PCM transcoding through FFmpeg
//! - The silent mixing canvas with additive overlay
//! - Frame sampling (video -> timestamped JPEGs) and duration probing

pub mod codec;
pub mod command;
pub mod error;
pub mod mix;
pub mod sampler;

pub use codec::{decode_mp3_to_pcm, encode_pcm_to_mp3};
pub use command::FfmpegCommand;
pub use error::{AudioError, AudioResult};
pub use mix::{mix_segments_to_mp3, AudioSegment, PcmCanvas, SAMPLE_RATE};
pub use sampler::{probe_duration, sample_frames, SampledVideo};
