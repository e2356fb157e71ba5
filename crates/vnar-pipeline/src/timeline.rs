//! Highlight timeline construction.
//!
//! Turns a batch of sampled frames into a deduplicated, time-ordered event
//! timeline, then fills oversized gaps. Remote extraction is asked for the
//! whole batch in one structured request; gap filling issues one scoped
//! request per oversized gap and falls back to a deterministic even
//! subdivision whenever that request fails or no frames cover the gap.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::warn;

use vnar_genai::{FileHandle, GenerationClient, PromptPart};
use vnar_models::{coerce_start, Frame, HighlightEvent};

use crate::error::PipelineResult;

/// Fallback subdivision density: roughly one synthetic event per this many
/// seconds of silence. Kept as integer division for compatibility with the
/// established timelines.
pub const FALLBACK_SECS_PER_EVENT: u32 = 7;

/// A sampled frame together with its uploaded file handle.
#[derive(Debug, Clone)]
pub struct UploadedFrame {
    pub time: u32,
    pub handle: FileHandle,
}

/// Upload every frame, skipping frames whose upload exhausts its retries.
///
/// A frame that cannot be uploaded costs coverage, not the run; extraction
/// proceeds with whatever made it through.
pub async fn upload_frames(
    client: &GenerationClient,
    frames: &[Frame],
) -> PipelineResult<Vec<UploadedFrame>> {
    let mut uploaded = Vec::with_capacity(frames.len());
    for frame in frames {
        match client.upload_file(&frame.image, "image/jpeg").await {
            Ok(handle) => uploaded.push(UploadedFrame {
                time: frame.time,
                handle,
            }),
            // Exhausted retries on one frame cost coverage, not the batch.
            Err(e @ vnar_genai::GenAiError::Exhausted { .. }) => {
                warn!(time = frame.time, error = %e, "dropping frame, upload exhausted");
            }
            Err(fatal) => return Err(fatal.into()),
        }
    }
    Ok(uploaded)
}

/// Extract the initial timeline from the uploaded frames.
///
/// If extraction yields no events but frames exist, one placeholder event at
/// the midpoint of the frame range guarantees the pipeline still has a
/// narration point.
pub async fn extract_timeline(
    client: &GenerationClient,
    frames: &[UploadedFrame],
) -> PipelineResult<Vec<HighlightEvent>> {
    if frames.is_empty() {
        return Ok(Vec::new());
    }

    let parts = extraction_parts(frames);
    let events = match client.generate_json(&parts).await {
        Ok(value) => parse_candidates(&value),
        Err(e @ vnar_genai::GenAiError::Exhausted { .. }) => {
            warn!(error = %e, "extraction exhausted its retries, falling back to midpoint event");
            Vec::new()
        }
        Err(fatal) => return Err(fatal.into()),
    };

    if events.is_empty() {
        let midpoint = (frames[0].time + frames[frames.len() - 1].time) / 2;
        return Ok(vec![HighlightEvent::placeholder(midpoint)]);
    }
    Ok(events)
}

fn extraction_parts(frames: &[UploadedFrame]) -> Vec<PromptPart> {
    let mut parts = Vec::with_capacity(frames.len() * 2 + 2);
    parts.push(PromptPart::text(
        "You are a sports/event commentator's assistant. The following frames \
         were sampled from one video; each frame is preceded by its timestamp.",
    ));
    for frame in frames {
        parts.push(PromptPart::text(format!(
            "Frame at {} seconds:",
            frame.time
        )));
        parts.push(PromptPart::File(frame.handle.clone()));
    }
    parts.push(PromptPart::text(
        r#"Identify the key moments worth narrating.

IMPORTANT: You must strictly follow this output format.
Return ONLY a JSON array with this schema:
[
  {"start": 0, "description": "What happens at this moment"}
]

- "start" is the moment's timestamp in whole seconds.
- Order the array by start ascending and do not repeat timestamps."#,
    ));
    parts
}

/// Parse extraction candidates defensively.
///
/// Candidates whose start cannot be coerced to a non-negative integer are
/// discarded; duplicate starts are collapsed first-wins; a missing or empty
/// description becomes the placeholder label. Output is sorted by start.
pub fn parse_candidates(value: &Value) -> Vec<HighlightEvent> {
    let items = match value.as_array() {
        Some(items) => items,
        None => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut events = Vec::new();
    for item in items {
        let start = match item.get("start").and_then(coerce_start) {
            Some(start) => start,
            None => continue,
        };
        if !seen.insert(start) {
            continue;
        }
        let description = item
            .get("description")
            .or_else(|| item.get("event_description"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(vnar_models::PLACEHOLDER_DESCRIPTION);
        events.push(HighlightEvent::new(start, description));
    }
    events.sort_by_key(|e| e.start);
    events
}

/// Evenly subdivide the open interval `(start, end)` into `max(1, gap / 7)`
/// synthetic placeholder events. Pure arithmetic; never fails.
pub fn subdivide_gap(start: u32, end: u32) -> Vec<HighlightEvent> {
    let gap = end.saturating_sub(start);
    let count = (gap / FALLBACK_SECS_PER_EVENT).max(1);
    let step = gap as f64 / (count + 1) as f64;
    (1..=count)
        .map(|k| HighlightEvent::placeholder(start + (step * k as f64).round() as u32))
        .collect()
}

/// Fill every gap larger than `max_gap`.
///
/// Gaps covered by frames get one scoped secondary request asking for
/// intermediate events; returned starts are clamped strictly inside the gap.
/// Any secondary failure, or a gap with no frames, falls back to
/// [`subdivide_gap`]. The result is merged last-writer-wins, re-sorted, and
/// then repaired with [`subdivide_gap`] until no consecutive gap exceeds
/// `max_gap` (a sparse secondary result is not trusted to be dense enough).
pub async fn fill_gaps(
    client: &GenerationClient,
    timeline: Vec<HighlightEvent>,
    frames: &[UploadedFrame],
    max_gap: u32,
) -> Vec<HighlightEvent> {
    if timeline.len() < 2 {
        return timeline;
    }

    let mut inserted = Vec::new();
    for pair in timeline.windows(2) {
        let (cur, next) = (&pair[0], &pair[1]);
        let gap = next.start - cur.start;
        if gap <= max_gap {
            continue;
        }

        let in_gap: Vec<&UploadedFrame> = frames
            .iter()
            .filter(|f| f.time > cur.start && f.time < next.start)
            .collect();

        let mut filled = Vec::new();
        if !in_gap.is_empty() {
            match request_gap_events(client, &in_gap, cur.start, next.start).await {
                Ok(events) => filled = events,
                Err(e) => {
                    warn!(
                        from = cur.start,
                        to = next.start,
                        error = %e,
                        "gap-fill request failed, subdividing instead"
                    );
                }
            }
        }
        if filled.is_empty() {
            filled = subdivide_gap(cur.start, next.start);
        }
        inserted.extend(filled);
    }

    let mut merged = merge_events(timeline, inserted);

    // A successful secondary request may still come back too sparse to meet
    // the gap bound. Keep subdividing the residual oversized gaps until every
    // consecutive pair fits.
    loop {
        let mut residual = Vec::new();
        for pair in merged.windows(2) {
            if pair[1].start - pair[0].start > max_gap {
                residual.extend(subdivide_gap(pair[0].start, pair[1].start));
            }
        }
        if residual.is_empty() {
            return merged;
        }
        let before = merged.len();
        merged = merge_events(merged, residual);
        if merged.len() == before {
            // No new starts: the remaining gaps cannot be split further.
            return merged;
        }
    }
}

async fn request_gap_events(
    client: &GenerationClient,
    frames: &[&UploadedFrame],
    from: u32,
    to: u32,
) -> PipelineResult<Vec<HighlightEvent>> {
    let mut parts = Vec::with_capacity(frames.len() * 2 + 1);
    parts.push(PromptPart::text(format!(
        "These frames cover the stretch between {from} and {to} seconds of the video."
    )));
    for frame in frames {
        parts.push(PromptPart::text(format!(
            "Frame at {} seconds:",
            frame.time
        )));
        parts.push(PromptPart::File(frame.handle.clone()));
    }
    parts.push(PromptPart::text(format!(
        r#"List the intermediate moments worth narrating, spaced roughly every 5 to 10 seconds.
Return ONLY a JSON array:
[
  {{"start": 0, "description": "What happens at this moment"}}
]
Every "start" must lie strictly between {from} and {to}."#,
    )));

    let value = client.generate_json(&parts).await?;
    let clamped = parse_candidates(&value)
        .into_iter()
        .map(|mut e| {
            // The model occasionally wanders outside its window.
            e.start = e.start.clamp(from + 1, to - 1);
            e
        })
        .collect();
    Ok(clamped)
}

/// Merge gap-fill events into the timeline: dedup by start with the filled
/// entries winning, then re-sort by construction of the map.
fn merge_events(
    base: Vec<HighlightEvent>,
    inserted: Vec<HighlightEvent>,
) -> Vec<HighlightEvent> {
    let mut merged: BTreeMap<u32, String> = BTreeMap::new();
    for event in base.into_iter().chain(inserted) {
        merged.insert(event.start, event.description);
    }
    merged
        .into_iter()
        .map(|(start, description)| HighlightEvent::new(start, description))
        .collect()
}
