//! Final pipeline output contract.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::event::HighlightEvent;
use crate::script::ScriptLine;

/// The structured result handed back to the caller after a successful run.
///
/// Serialized as `result.json` in the output directory and echoed to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Final gap-filled timeline
    pub timeline: Vec<HighlightEvent>,

    /// Generated narration lines, one per narrated event
    pub lines: Vec<ScriptLine>,

    /// All narration text concatenated in timeline order
    pub script: String,

    /// Total video duration in seconds
    pub duration_sec: f64,

    /// Path to the mixed narration audio
    pub audio_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_round_trips_through_json() {
        let out = PipelineOutput {
            timeline: vec![HighlightEvent::new(0, "intro")],
            lines: vec![ScriptLine::new("line-0", 0, "Here we go", 1.0)],
            script: "Here we go".to_string(),
            duration_sec: 42.5,
            audio_path: PathBuf::from("/tmp/out/narration.mp3"),
        };
        let json = serde_json::to_string(&out).unwrap();
        let back: PipelineOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timeline.len(), 1);
        assert_eq!(back.lines[0].id, "line-0");
        assert_eq!(back.duration_sec, 42.5);
    }
}
