//! Shared data models for the VidNarrator pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Sampled video frames
//! - Timeline highlight events
//! - Narration script lines
//! - The final pipeline output contract

pub mod event;
pub mod frame;
pub mod output;
pub mod script;

// Re-export common types
pub use event::{coerce_start, HighlightEvent, PLACEHOLDER_DESCRIPTION};
pub use frame::Frame;
pub use output::PipelineOutput;
pub use script::{clamp_rate, ScriptLine, MAX_RATE, MIN_RATE};
