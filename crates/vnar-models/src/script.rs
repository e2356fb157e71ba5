//! Narration script line model.

use serde::{Deserialize, Serialize};

/// Minimum accepted speaking-rate multiplier.
pub const MIN_RATE: f64 = 0.5;

/// Maximum accepted speaking-rate multiplier.
pub const MAX_RATE: f64 = 2.0;

/// One speakable commentary line, paced to fit its time budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLine {
    /// Stable identifier derived from the event's timeline position
    pub id: String,

    /// Start timestamp in whole seconds
    pub start: u32,

    /// Commentary text
    pub text: String,

    /// Speaking-rate multiplier, always within [`MIN_RATE`, `MAX_RATE`]
    pub rate: f64,
}

impl ScriptLine {
    /// Create a new line. The rate is clamped into the accepted range.
    pub fn new(id: impl Into<String>, start: u32, text: impl Into<String>, rate: f64) -> Self {
        Self {
            id: id.into(),
            start,
            text: text.into(),
            rate: clamp_rate(rate),
        }
    }
}

/// Clamp a speaking-rate multiplier into [`MIN_RATE`, `MAX_RATE`].
///
/// Non-finite upstream values fall back to 1.0.
pub fn clamp_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 1.0;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}
