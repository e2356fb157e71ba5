//! MP3 <-> PCM transcoding through FFmpeg.
//!
//! Encoded audio crosses this boundary as files: FFmpeg reads and writes
//! temp files in a scratch directory rather than pipes, which keeps the
//! invocations simple and the stderr diagnostics intact.

use std::path::Path;

use crate::command::FfmpegCommand;
use crate::error::{AudioError, AudioResult};

/// Decode MP3 bytes to mono s16 PCM at the given sample rate.
pub async fn decode_mp3_to_pcm(mp3: &[u8], sample_rate: u32) -> AudioResult<Vec<i16>> {
    if mp3.is_empty() {
        return Err(AudioError::invalid_audio("empty MP3 payload"));
    }

    let scratch = tempfile::tempdir()?;
    let input = scratch.path().join("segment.mp3");
    let output = scratch.path().join("segment.pcm");
    tokio::fs::write(&input, mp3).await?;

    FfmpegCommand::new(&input, &output)
        .output_args([
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
        ])
        .run()
        .await?;

    let bytes = tokio::fs::read(&output).await?;
    Ok(bytes_to_pcm(&bytes))
}

/// Encode mono s16 PCM to an MP3 file at `output`.
pub async fn encode_pcm_to_mp3(
    pcm: &[i16],
    sample_rate: u32,
    output: &Path,
) -> AudioResult<()> {
    let scratch = tempfile::tempdir()?;
    let input = scratch.path().join("canvas.pcm");
    tokio::fs::write(&input, pcm_to_bytes(pcm)).await?;

    let rate = sample_rate.to_string();
    FfmpegCommand::new(&input, output)
        .input_args(["-f", "s16le", "-ac", "1", "-ar", &rate])
        .output_args(["-codec:a", "libmp3lame", "-qscale:a", "4"])
        .run()
        .await
}

fn bytes_to_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn pcm_to_bytes(pcm: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pcm.len() * 2);
    for sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
