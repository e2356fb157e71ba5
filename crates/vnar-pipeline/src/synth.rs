//! Audio timeline synthesis stage.
//!
//! Renders every script line to speech and mixes the segments onto one
//! track. Per-line synthesis failures cost that line's audio, not the run;
//! producing zero segments is the terminal condition.

use std::path::Path;

use tracing::warn;

use vnar_audio::{mix_segments_to_mp3, AudioSegment};
use vnar_genai::{TtsClient, VoiceCatalog};
use vnar_models::ScriptLine;

use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;

/// Synthesize and mix all lines into `output`. Returns the mixed duration
/// in milliseconds.
pub async fn synthesize_track(
    tts: &TtsClient,
    catalog: &VoiceCatalog,
    requested_voice: Option<&str>,
    lines: &[ScriptLine],
    output: impl AsRef<Path>,
    logger: &RunLogger,
) -> PipelineResult<u64> {
    if lines.is_empty() {
        return Err(PipelineError::Audio(vnar_audio::AudioError::NoSegments));
    }

    let voice = catalog.resolve(tts, requested_voice).await;
    logger.log_progress(&format!("narrating {} lines with voice {voice}", lines.len()));

    let mut segments = Vec::with_capacity(lines.len());
    for line in lines {
        match tts.synthesize(&line.text, &voice, line.rate).await {
            Ok(bytes) => {
                segments.push(AudioSegment::new(line.start as u64 * 1000, bytes));
            }
            Err(e) => {
                warn!(line = %line.id, error = %e, "speech synthesis failed, dropping line audio");
            }
        }
    }

    let duration_ms = mix_segments_to_mp3(&segments, output).await?;
    logger.log_progress(&format!(
        "mixed {} segments into {duration_ms} ms of audio",
        segments.len()
    ));
    Ok(duration_ms)
}
