//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Generation service error: {0}")]
    GenAi(#[from] vnar_genai::GenAiError),

    #[error("Audio error: {0}")]
    Audio(#[from] vnar_audio::AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Whether this is the no-audio-segments terminal condition.
    pub fn is_no_segments(&self) -> bool {
        matches!(self, PipelineError::Audio(vnar_audio::AudioError::NoSegments))
    }
}
