//! Narration script generation.
//!
//! Each timeline event becomes one commentary line whose speakable duration
//! fits the time available before the next event. Line generation must never
//! abort the run: any remote failure falls back to the event's description
//! spoken verbatim at normal rate.

use serde_json::Value;
use tracing::warn;

use vnar_genai::{GenerationClient, PromptPart};
use vnar_models::{clamp_rate, HighlightEvent, ScriptLine};

/// Seconds of available time between an event and its successor, or the
/// trailing allowance for the last event.
pub fn budget_secs(timeline: &[HighlightEvent], index: usize, trailing_allowance: u32) -> i64 {
    match timeline.get(index + 1) {
        Some(next) => next.start as i64 - timeline[index].start as i64,
        None => trailing_allowance as i64,
    }
}

/// Generate one script line per narratable event.
///
/// Events with a non-positive budget are skipped. Ids are positional and
/// stable across reruns of the same timeline.
pub async fn generate_script(
    client: &GenerationClient,
    timeline: &[HighlightEvent],
    trailing_allowance: u32,
) -> Vec<ScriptLine> {
    let mut lines = Vec::with_capacity(timeline.len());

    for (index, event) in timeline.iter().enumerate() {
        let budget = budget_secs(timeline, index, trailing_allowance);
        if budget <= 0 {
            warn!(start = event.start, budget, "skipping event with no speaking time");
            continue;
        }

        let id = format!("line-{index}");
        let line = match request_line(client, event, budget).await {
            Ok((text, rate)) => ScriptLine::new(id, event.start, text, rate),
            Err(e) => {
                warn!(
                    start = event.start,
                    error = %e,
                    "line generation failed, narrating the description verbatim"
                );
                ScriptLine::new(id, event.start, event.description.clone(), 1.0)
            }
        };
        lines.push(line);
    }
    lines
}

async fn request_line(
    client: &GenerationClient,
    event: &HighlightEvent,
    budget: i64,
) -> crate::error::PipelineResult<(String, f64)> {
    let prompt = format!(
        r#"Write one energetic spoken commentary line for this moment of the video.

MOMENT: {description}
You have {budget} seconds of air time before the next moment.

Return ONLY a JSON object:
{{"text": "the commentary line", "rate": 1.0}}

- "text" must be speakable within the air time at the given rate.
- "rate" is a speaking-rate multiplier between 0.5 and 2.0."#,
        description = event.description,
    );

    let value = client.generate_json(&[PromptPart::text(prompt)]).await?;
    let text = value
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| event.description.clone());
    let rate = value
        .get("rate")
        .and_then(value_as_f64)
        .map(clamp_rate)
        .unwrap_or(1.0);
    Ok((text, rate))
}

/// The model returns rates as numbers or numeric strings interchangeably.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_budget_uses_next_event_then_trailing_allowance() {
        let timeline = vec![
            HighlightEvent::new(0, "a"),
            HighlightEvent::new(5, "b"),
            HighlightEvent::new(30, "c"),
        ];
        assert_eq!(budget_secs(&timeline, 0, 8), 5);
        assert_eq!(budget_secs(&timeline, 1, 8), 25);
        assert_eq!(budget_secs(&timeline, 2, 8), 8);
    }

    #[test]
    fn test_value_as_f64_accepts_numeric_strings() {
        assert_eq!(value_as_f64(&json!(1.5)), Some(1.5));
        assert_eq!(value_as_f64(&json!("1.5")), Some(1.5));
        assert_eq!(value_as_f64(&json!("fast")), None);
    }
}
