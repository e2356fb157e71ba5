//! Silent PCM canvas with additive overlay.
//!
//! The mixing model: one mono s16 buffer spanning the whole narration
//! window, silent by default, with every synthesized segment added in at its
//! start position. Overlapping segments sum (saturating at the i16 bounds),
//! nothing is truncated.

use std::path::Path;

use crate::codec::{decode_mp3_to_pcm, encode_pcm_to_mp3};
use crate::error::{AudioError, AudioResult};

/// Sample rate for the mixing canvas, in Hz.
pub const SAMPLE_RATE: u32 = 24_000;

/// Trailing silence appended after the last segment, in milliseconds.
const TRAILING_SILENCE_MS: u64 = 1000;

/// One synthesized narration segment positioned on the shared time axis.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Placement on the canvas, in milliseconds
    pub start_ms: u64,
    /// Encoded MP3 bytes from the speech service
    pub samples: Vec<u8>,
}

impl AudioSegment {
    pub fn new(start_ms: u64, samples: Vec<u8>) -> Self {
        Self { start_ms, samples }
    }
}

/// Mono s16 mixing canvas.
#[derive(Debug)]
pub struct PcmCanvas {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl PcmCanvas {
    /// Allocate a silent canvas spanning `duration_ms`.
    pub fn new(duration_ms: u64, sample_rate: u32) -> Self {
        Self {
            samples: vec![0i16; ms_to_samples(duration_ms, sample_rate)],
            sample_rate,
        }
    }

    /// Canvas length in samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Canvas duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// The raw samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Additively overlay `pcm` starting at `start_ms`.
    ///
    /// The canvas grows if the overlay runs past its end, so no audio is
    /// ever cut off. Summed samples saturate at the i16 bounds.
    pub fn overlay_at_ms(&mut self, start_ms: u64, pcm: &[i16]) {
        let offset = ms_to_samples(start_ms, self.sample_rate);
        let end = offset + pcm.len();
        if end > self.samples.len() {
            self.samples.resize(end, 0);
        }
        for (i, &sample) in pcm.iter().enumerate() {
            let slot = &mut self.samples[offset + i];
            *slot = slot.saturating_add(sample);
        }
    }
}

fn ms_to_samples(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

/// Mix every segment onto one canvas and export it as MP3.
///
/// The canvas spans the furthest segment end plus one second of trailing
/// silence. Returns the mixed duration in milliseconds. Zero segments is a
/// terminal condition: nothing is written and [`AudioError::NoSegments`] is
/// returned.
pub async fn mix_segments_to_mp3(
    segments: &[AudioSegment],
    output: impl AsRef<Path>,
) -> AudioResult<u64> {
    if segments.is_empty() {
        return Err(AudioError::NoSegments);
    }

    let mut decoded = Vec::with_capacity(segments.len());
    let mut max_end_ms = 0u64;
    for segment in segments {
        let pcm = decode_mp3_to_pcm(&segment.samples, SAMPLE_RATE).await?;
        let len_ms = pcm.len() as u64 * 1000 / SAMPLE_RATE as u64;
        max_end_ms = max_end_ms.max(segment.start_ms + len_ms);
        decoded.push((segment.start_ms, pcm));
    }

    let mut canvas = PcmCanvas::new(max_end_ms + TRAILING_SILENCE_MS, SAMPLE_RATE);
    for (start_ms, pcm) in &decoded {
        canvas.overlay_at_ms(*start_ms, pcm);
    }

    encode_pcm_to_mp3(canvas.samples(), SAMPLE_RATE, output.as_ref()).await?;
    Ok(canvas.duration_ms())
}
