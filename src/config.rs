// Sequencer configuration
// Loaded from RON; every field has a default so partial files are accepted

use crate::sequencer::arrangement::DEFAULT_TRACK_COLOR;
use crate::sequencer::clip::DEFAULT_CLIP_DURATION;
use crate::sequencer::timeline::{SnapMode, Tempo};
use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the sequencer core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Maximum number of undo steps
    pub history_capacity: usize,

    /// Tempo of new sessions
    pub default_bpm: f64,

    /// Snap grid of new sessions
    pub snap_mode: SnapMode,

    /// Duration of new empty clips, in seconds
    pub default_clip_duration: f64,

    /// Duration given to an `on` event without a matching `off`, in beats
    pub orphan_duration_beats: f64,

    /// Synth name used when a sequence file declares none
    pub default_synth_name: String,

    pub default_track_color: [u8; 3],

    /// Project layout: folder (relative to the project root) holding clip files
    pub clips_folder: String,

    /// Project layout: arrangement document file name
    pub arrangement_file: String,

    /// Extension of clip files, without the dot
    pub clip_extension: String,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            history_capacity: crate::command::manager::DEFAULT_MAX_HISTORY,
            default_bpm: 120.0,
            snap_mode: SnapMode::Quarter,
            default_clip_duration: DEFAULT_CLIP_DURATION,
            orphan_duration_beats: 0.25,
            default_synth_name: "unknown".to_string(),
            default_track_color: DEFAULT_TRACK_COLOR,
            clips_folder: "clips".to_string(),
            arrangement_file: "arrangement.json".to_string(),
            clip_extension: "seq".to_string(),
        }
    }
}

impl SequencerConfig {
    /// Parse and validate a RON document
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if Tempo::try_new(self.default_bpm).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_bpm must be between {} and {}",
                Tempo::MIN_BPM,
                Tempo::MAX_BPM
            )));
        }
        if !(self.default_clip_duration > 0.0) {
            return Err(ConfigError::Invalid(
                "default_clip_duration must be > 0".to_string(),
            ));
        }
        if !(self.orphan_duration_beats > 0.0) {
            return Err(ConfigError::Invalid(
                "orphan_duration_beats must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Tempo of new sessions (falls back to 120 BPM if out of range)
    pub fn tempo(&self) -> Tempo {
        Tempo::try_new(self.default_bpm).unwrap_or_default()
    }

    /// Relative path of a clip file named `stem`
    pub fn clip_path(&self, stem: &str) -> String {
        format!("{}/{}.{}", self.clips_folder, stem, self.clip_extension)
    }
}
