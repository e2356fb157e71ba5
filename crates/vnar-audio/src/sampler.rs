//! Frame sampling and duration probing.
//!
//! Extracts one scaled JPEG per sampling step with FFmpeg's `fps` filter and
//! probes the container duration with FFprobe. Downstream stages treat the
//! resulting images as opaque handles.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

use vnar_models::Frame;

use crate::command::FfmpegCommand;
use crate::error::{AudioError, AudioResult};

/// Ordered frames sampled from a video plus its probed duration.
#[derive(Debug)]
pub struct SampledVideo {
    pub frames: Vec<Frame>,
    pub duration_sec: f64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a video file for its duration in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> AudioResult<f64> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }
    which::which("ffprobe").map_err(|_| AudioError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AudioError::ffprobe_failed(format!(
            "ffprobe exited with {}: {stderr}",
            output.status
        )));
    }

    let probed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    probed
        .format
        .duration
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| AudioError::ffprobe_failed("no duration in ffprobe output"))
}

/// Sample one frame every `interval_sec` seconds into `out_dir`.
///
/// Frames are scaled down to a prompt-friendly width; timestamps are the
/// sampling step index times the interval.
pub async fn sample_frames(
    video: impl AsRef<Path>,
    interval_sec: u32,
    out_dir: impl AsRef<Path>,
) -> AudioResult<SampledVideo> {
    let video = video.as_ref();
    let out_dir = out_dir.as_ref();
    if !video.exists() {
        return Err(AudioError::FileNotFound(video.to_path_buf()));
    }
    let interval_sec = interval_sec.max(1);

    let duration_sec = probe_duration(video).await?;
    tokio::fs::create_dir_all(out_dir).await?;

    let pattern = out_dir.join("frame_%05d.jpg");
    FfmpegCommand::new(video, &pattern)
        .video_filter(format!("fps=1/{interval_sec},scale=640:-2"))
        .output_args(["-q:v", "5"])
        .run()
        .await?;

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("frame_") && name.ends_with(".jpg") {
            names.push(entry.path());
        }
    }
    names.sort();

    let frames: Vec<Frame> = names
        .into_iter()
        .enumerate()
        .map(|(i, path)| Frame::new(i as u32 * interval_sec, path))
        .collect();

    info!(
        frames = frames.len(),
        duration_sec, "sampled video frames"
    );
    Ok(SampledVideo {
        frames,
        duration_sec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_missing_file_is_not_found() {
        let err = probe_duration("/nonexistent/video.mp4").await.unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_sample_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = sample_frames("/nonexistent/video.mp4", 5, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound(_)));
    }
}
