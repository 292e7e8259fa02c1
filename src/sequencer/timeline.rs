// Timeline - Tempo and snap-to-grid quantization
// Converts continuous time (seconds) to the nearest tempo-relative grid line

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Fallible constructor for values coming from files or user input
    pub fn try_new(bpm: f64) -> Option<Self> {
        if bpm.is_finite() && (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            Some(Self { bpm })
        } else {
            None
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.beat_duration_seconds()
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds / self.beat_duration_seconds()
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Grid resolution used when placing notes and clip instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    None,
    Beat,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl SnapMode {
    pub const ALL: [SnapMode; 6] = [
        SnapMode::None,
        SnapMode::Beat,
        SnapMode::Half,
        SnapMode::Quarter,
        SnapMode::Eighth,
        SnapMode::Sixteenth,
    ];

    /// Subdivisions of one beat, `None` for no snapping
    pub fn divisor(&self) -> Option<u32> {
        match self {
            SnapMode::None => None,
            SnapMode::Beat => Some(1),
            SnapMode::Half => Some(2),
            SnapMode::Quarter => Some(4),
            SnapMode::Eighth => Some(8),
            SnapMode::Sixteenth => Some(16),
        }
    }
}

impl fmt::Display for SnapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapMode::None => "none",
            SnapMode::Beat => "1/1",
            SnapMode::Half => "1/2",
            SnapMode::Quarter => "1/4",
            SnapMode::Eighth => "1/8",
            SnapMode::Sixteenth => "1/16",
        };
        f.write_str(name)
    }
}

/// Grid interval in seconds for the given tempo and snap mode (0 = no snapping)
pub fn grid_interval(tempo: &Tempo, mode: SnapMode) -> f64 {
    match mode.divisor() {
        Some(divisor) => tempo.beat_duration_seconds() / divisor as f64,
        None => 0.0,
    }
}

/// Snap a time value to the nearest grid line
pub fn snap_time(time: f64, tempo: &Tempo, mode: SnapMode) -> f64 {
    let interval = grid_interval(tempo, mode);
    if interval <= 0.0 {
        return time;
    }
    (time / interval).round() * interval
}

/// Tempo + snap mode pair applied to every note or clip instance placement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantizer {
    tempo: Tempo,
    mode: SnapMode,
}

impl Quantizer {
    pub fn new(tempo: Tempo, mode: SnapMode) -> Self {
        Self { tempo, mode }
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    pub fn mode(&self) -> SnapMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SnapMode) {
        self.mode = mode;
    }

    pub fn grid_interval(&self) -> f64 {
        grid_interval(&self.tempo, self.mode)
    }

    pub fn snap(&self, time: f64) -> f64 {
        snap_time(time, &self.tempo, self.mode)
    }
}
