//! Structured run logging utilities.

use tracing::{error, info, warn, Span};

/// Run logger for structured logging with consistent formatting.
///
/// Carries the run id and the current pipeline stage so every log line can
/// be correlated back to one invocation.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: String,
}

impl RunLogger {
    /// Create a logger for a specific run and stage.
    pub fn new(run_id: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            stage: stage.into(),
        }
    }

    /// Re-scope the logger to another stage of the same run.
    pub fn stage(&self, stage: impl Into<String>) -> Self {
        Self {
            run_id: self.run_id.clone(),
            stage: stage.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Create a tracing span for this stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("stage", run_id = %self.run_id, stage = %self.stage)
    }
}
