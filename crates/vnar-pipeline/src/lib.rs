//! Narration pipeline orchestrator.
//!
//! This crate wires the stages together:
//! - Frame upload and highlight timeline extraction
//! - Gap filling with deterministic fallback subdivision
//! - Time-budgeted script generation
//! - Speech synthesis and mixing onto one track

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod script;
pub mod synth;
pub mod timeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use runner::Pipeline;
