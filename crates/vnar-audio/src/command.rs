//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AudioError, AudioResult};

/// Builder for FFmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_args(["-vf".to_string(), filter.into()])
    }

    /// Build the argument list.
    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ];
        if self.overwrite {
            args.push("-y".to_string());
        }
        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Run the command to completion, capturing stderr for diagnostics.
    pub async fn run(&self) -> AudioResult<()> {
        which::which("ffmpeg").map_err(|_| AudioError::FfmpegNotFound)?;

        let args = self.build_args();
        debug!(args = ?args, "running ffmpeg");

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(AudioError::ffmpeg_failed(
                format!("ffmpeg exited with {}", output.status),
                Some(stderr),
                output.status.code(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_layout() {
        let cmd = FfmpegCommand::new("in.mp3", "out.pcm")
            .input_args(["-f", "mp3"])
            .output_args(["-ac", "1"]);
        let args = cmd.build_args();

        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(args.iter().position(|a| a == "-f").unwrap() < i_pos);
        assert!(args.iter().position(|a| a == "-ac").unwrap() > i_pos);
        assert_eq!(args.last().unwrap(), "out.pcm");
        assert!(args.contains(&"-y".to_string()));
    }
}
