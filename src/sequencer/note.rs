// Note representation for the sequencer
// A note is a single sound event: start, duration, synth voice type and parameter vector

use serde::{Deserialize, Serialize};

/// Unique identifier for notes
pub type NoteId = u64;

/// Frequency used when a note carries no parameter vector
pub const DEFAULT_FREQUENCY: f64 = 440.0;

/// Amplitude used when a note carries fewer than two parameters
pub const DEFAULT_AMPLITUDE: f64 = 0.5;

/// A single sound event inside a clip
///
/// `frequency` and `amplitude` mirror `params[0]` and `params[1]`. Use the setters to keep
/// them in sync; `param_names` is expected to stay parallel to `params` but that is up to
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for this note
    pub id: NoteId,

    /// Start time in seconds, relative to the owning clip
    pub start_time: f64,

    /// Duration in seconds (> 0)
    pub duration: f64,

    /// Voice type instantiated on the synthesis engine
    pub synth_name: String,

    pub frequency: f64,
    pub amplitude: f64,

    params: Vec<f64>,
    pub param_names: Vec<String>,

    pub selected: bool,
    pub muted: bool,
}

impl Note {
    /// Creates a new note
    pub fn new(
        id: NoteId,
        synth_name: impl Into<String>,
        start_time: f64,
        duration: f64,
        params: Vec<f64>,
        param_names: Vec<String>,
    ) -> Self {
        assert!(duration > 0.0, "Note duration must be > 0");
        assert!(start_time >= 0.0, "Note start time must be >= 0");

        let frequency = params.first().copied().unwrap_or(DEFAULT_FREQUENCY);
        let amplitude = params.get(1).copied().unwrap_or(DEFAULT_AMPLITUDE);

        Self {
            id,
            start_time,
            duration,
            synth_name: synth_name.into(),
            frequency,
            amplitude,
            params,
            param_names,
            selected: false,
            muted: false,
        }
    }

    /// End time in seconds (relative to the clip)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Check if this note sounds at a given clip-relative time
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// Full parameter vector
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Set one parameter, growing the vector if needed
    pub fn set_param(&mut self, index: usize, value: f64) {
        if index >= self.params.len() {
            self.params.resize(index + 1, 0.0);
        }
        self.params[index] = value;
        match index {
            0 => self.frequency = value,
            1 => self.amplitude = value,
            _ => {}
        }
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.set_param(0, frequency);
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        if self.params.is_empty() {
            self.params.push(self.frequency);
        }
        self.set_param(1, amplitude);
    }

    /// Index of a named parameter
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }

    /// Nearest equal-tempered note name of the frequency (e.g., "A4", "C#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return "-".to_string();
        }

        // MIDI 69 = A4 = 440 Hz
        let midi = (69.0 + 12.0 * (self.frequency / 440.0).log2()).round() as i32;
        let octave = midi.div_euclid(12) - 1;
        let note_index = midi.rem_euclid(12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}
