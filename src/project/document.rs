// Arrangement document (JSON)
// Serializable mirror of the arrangement; clips are referenced by file path

use crate::sequencer::arrangement::{AutomationLane, DEFAULT_TRACK_COLOR};
use crate::sequencer::timeline::SnapMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// View state stored alongside the arrangement. Opaque to the sequencer core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub pixels_per_second: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            pixels_per_second: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDocument {
    #[serde(default)]
    pub synth_name: Option<String>,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub automation_lanes: Vec<AutomationLane>,
}

fn default_color() -> [u8; 3] {
    DEFAULT_TRACK_COLOR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipInstanceDocument {
    /// Clip file path, relative to the project folder
    pub file_path: String,
    #[serde(default)]
    pub track_synth_name: Option<String>,
    /// Position of the track in the document, used when the track has no synth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_index: Option<usize>,
    pub start_time: f64,
}

/// Root of `arrangement.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementDocument {
    pub bpm: f64,
    #[serde(default)]
    pub loop_enabled: bool,
    #[serde(default)]
    pub loop_start: f64,
    #[serde(default = "default_loop_end")]
    pub loop_end: f64,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub tracks: Vec<TrackDocument>,
    #[serde(default)]
    pub clip_instances: Vec<ClipInstanceDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_mode: Option<SnapMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

fn default_loop_end() -> f64 {
    crate::sequencer::transport::Transport::DEFAULT_LOOP_END
}

impl ArrangementDocument {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let doc = ArrangementDocument::from_json(
            r#"{
                "bpm": 96,
                "tracks": [{ "synthName": "sine", "name": "Sine" }],
                "clipInstances": [
                    { "filePath": "clips/a.seq", "trackSynthName": "sine", "startTime": 1.5 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.bpm, 96.0);
        assert!(!doc.loop_enabled);
        assert_eq!(doc.loop_end, 4.0);
        assert_eq!(doc.viewport, Viewport::default());
        assert_eq!(doc.tracks[0].color, DEFAULT_TRACK_COLOR);
        assert_eq!(doc.clip_instances[0].start_time, 1.5);
        assert!(doc.snap_mode.is_none());
        assert!(doc.saved_at.is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let doc = ArrangementDocument {
            bpm: 120.0,
            loop_enabled: true,
            loop_start: 0.0,
            loop_end: 8.0,
            viewport: Viewport::default(),
            tracks: vec![TrackDocument {
                synth_name: None,
                name: "Drums".to_string(),
                color: [1, 2, 3],
                muted: false,
                solo: true,
                expanded: false,
                automation_lanes: vec![AutomationLane::new(0, "freq")],
            }],
            clip_instances: vec![ClipInstanceDocument {
                file_path: "clips/beat.seq".to_string(),
                track_synth_name: None,
                track_index: Some(0),
                start_time: 2.0,
            }],
            snap_mode: Some(SnapMode::Eighth),
            saved_at: None,
        };

        let json = doc.to_json().unwrap();
        for key in [
            "loopEnabled",
            "loopStart",
            "loopEnd",
            "clipInstances",
            "filePath",
            "trackSynthName",
            "trackIndex",
            "startTime",
            "automationLanes",
            "paramIndex",
            "pixelsPerSecond",
            "snapMode",
        ] {
            assert!(json.contains(key), "missing {}", key);
        }
        assert!(!json.contains("savedAt"));
        assert_eq!(ArrangementDocument::from_json(&json).unwrap(), doc);
    }
}
