//! Sampled video frame model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single frame sampled from the source video.
///
/// Frames are produced by the sampler in ascending time order, one per
/// sampling step. The image itself is an opaque handle (a JPEG on disk);
/// nothing downstream inspects pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Timestamp of the frame within the video, in whole seconds
    pub time: u32,

    /// Path to the extracted frame image
    pub image: PathBuf,
}

impl Frame {
    /// Create a new frame.
    pub fn new(time: u32, image: impl Into<PathBuf>) -> Self {
        Self {
            time,
            image: image.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ordering_by_time() {
        let mut frames = vec![Frame::new(10, "b.jpg"), Frame::new(3, "a.jpg")];
        frames.sort_by_key(|f| f.time);
        assert_eq!(frames[0].time, 3);
        assert_eq!(frames[1].time, 10);
    }
}
