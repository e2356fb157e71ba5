//! Timeline highlight event model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description used when the vision service returns an event without one,
/// and for synthetic events inserted by the gap-fill fallback.
pub const PLACEHOLDER_DESCRIPTION: &str = "A notable moment in the video";

/// A key moment detected in the video.
///
/// Within one timeline, `start` values are unique and strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightEvent {
    /// Start timestamp in whole seconds
    pub start: u32,

    /// Description of what happens at this moment
    pub description: String,
}

impl HighlightEvent {
    /// Create a new event.
    pub fn new(start: u32, description: impl Into<String>) -> Self {
        Self {
            start,
            description: description.into(),
        }
    }

    /// Create a synthetic event carrying the placeholder description.
    pub fn placeholder(start: u32) -> Self {
        Self::new(start, PLACEHOLDER_DESCRIPTION)
    }
}

/// Coerce a JSON value into a non-negative whole-second start timestamp.
///
/// The vision service is asked for integer seconds but in practice returns
/// numbers, floats, and numeric strings interchangeably. Fractional values
/// are rounded to the nearest second. Returns `None` for anything that does
/// not coerce (the caller discards the candidate).
pub fn coerce_start(value: &Value) -> Option<u32> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(secs.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_start_integer() {
        assert_eq!(coerce_start(&json!(12)), Some(12));
        assert_eq!(coerce_start(&json!(0)), Some(0));
    }

    #[test]
    fn test_coerce_start_float_rounds() {
        assert_eq!(coerce_start(&json!(3.4)), Some(3));
        assert_eq!(coerce_start(&json!(3.5)), Some(4));
    }

    #[test]
    fn test_coerce_start_numeric_string() {
        assert_eq!(coerce_start(&json!("3.7")), Some(4));
        assert_eq!(coerce_start(&json!(" 15 ")), Some(15));
    }

    #[test]
    fn test_coerce_start_rejects_garbage() {
        assert_eq!(coerce_start(&json!("soon")), None);
        assert_eq!(coerce_start(&json!(-2)), None);
        assert_eq!(coerce_start(&json!(null)), None);
        assert_eq!(coerce_start(&json!([1])), None);
    }
}
