// Transport - Playback control and state management
// Converts wall-clock time into playhead position using an anchor pair

use super::timeline::Tempo;
use serde::{Deserialize, Serialize};

/// Transport state (play/pause/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Check if transport is stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Wall-clock instant paired with the playhead position at that instant
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    wall_time: f64,
    position: f64,
}

/// Result of advancing the playhead for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Start of the trigger window
    pub prev_time: f64,
    /// End of the trigger window (exclusive)
    pub current_time: f64,
    /// The playhead crossed the loop end during this advance
    pub wrapped: bool,
}

/// Transport controller
/// Owns tempo, loop range and the playhead. Voice handling is left to the scheduler:
/// methods report whether the sounding voices must be flushed.
#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    tempo: Tempo,
    position: f64,
    anchor: Option<Anchor>,
    loop_enabled: bool,
    loop_start: f64,
    loop_end: f64,
    tick_scheduled: bool,
}

impl Transport {
    /// Default loop range: two 4/4 bars at 120 BPM
    pub const DEFAULT_LOOP_END: f64 = 4.0;

    /// Create new transport
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            tempo: Tempo::default(),
            position: 0.0,
            anchor: None,
            loop_enabled: false,
            loop_start: 0.0,
            loop_end: Self::DEFAULT_LOOP_END,
            tick_scheduled: false,
        }
    }

    /// Get current state
    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Whether the host should keep its periodic tick callback armed
    pub fn is_tick_scheduled(&self) -> bool {
        self.tick_scheduled
    }

    /// Playhead position at wall-clock `now`
    pub fn current_time(&self, now: f64) -> f64 {
        match (self.state, self.anchor) {
            (TransportState::Playing, Some(anchor)) => {
                anchor.position + (now - anchor.wall_time).max(0.0)
            }
            _ => self.position,
        }
    }

    /// Last position the playhead was committed to
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Start playback. Returns false if already playing.
    pub fn play(&mut self, now: f64) -> bool {
        if self.state.is_playing() {
            return false;
        }
        self.anchor = Some(Anchor {
            wall_time: now,
            position: self.position,
        });
        self.state = TransportState::Playing;
        self.tick_scheduled = true;
        true
    }

    /// Pause (keep current position). Returns true if voices must be released.
    pub fn pause(&mut self, now: f64) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        self.position = self.current_time(now);
        self.anchor = None;
        self.state = TransportState::Paused;
        self.tick_scheduled = false;
        true
    }

    /// Stop and rewind to the loop start (looping) or zero. Voices must always be released.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.anchor = None;
        self.tick_scheduled = false;
        self.position = if self.loop_enabled {
            self.loop_start
        } else {
            0.0
        };
    }

    /// Toggle play/pause. Returns true if voices must be released.
    pub fn toggle_play(&mut self, now: f64) -> bool {
        if self.state.is_playing() {
            self.pause(now)
        } else {
            self.play(now);
            false
        }
    }

    /// Seek. Returns true if voices must be released (only while playing).
    pub fn set_position(&mut self, time: f64, now: f64) -> bool {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        self.position = time;
        if self.state.is_playing() {
            self.anchor = Some(Anchor {
                wall_time: now,
                position: time,
            });
            true
        } else {
            false
        }
    }

    /// Advance the playhead to wall-clock `now`, wrapping around the loop if needed.
    /// Returns `None` when not playing.
    ///
    /// Normally the trigger window is `[previous position, new position)`. When the playhead
    /// crosses the loop end, the position wraps (modulo the loop length) and the window becomes
    /// `[loop_start, wrapped position)`. Notes starting in the skipped tail between the previous
    /// position and `loop_end` are not triggered on that pass; the caller is expected to
    /// release sounding voices when `wrapped` is set.
    pub fn advance(&mut self, now: f64) -> Option<Advance> {
        if !self.state.is_playing() {
            return None;
        }

        let prev_time = self.position;
        let current_time = self.current_time(now);

        if self.loop_enabled && self.loop_end > self.loop_start && current_time >= self.loop_end {
            let loop_length = self.loop_end - self.loop_start;
            let overflow = current_time - self.loop_end;
            let wrapped_time = self.loop_start + overflow.rem_euclid(loop_length);

            self.anchor = Some(Anchor {
                wall_time: now,
                position: wrapped_time,
            });
            self.position = wrapped_time;
            return Some(Advance {
                prev_time: self.loop_start,
                current_time: wrapped_time,
                wrapped: true,
            });
        }

        self.position = current_time;
        Some(Advance {
            prev_time,
            current_time,
            wrapped: false,
        })
    }

    /// Get tempo
    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    /// Set tempo
    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    /// Enable/disable loop
    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Check if loop is enabled
    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Set loop region. Rejected (returns false) unless `0 <= start < end`.
    pub fn set_loop_region(&mut self, start: f64, end: f64) -> bool {
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || end <= start {
            log::warn!("Rejected loop region [{}, {})", start, end);
            return false;
        }
        self.loop_start = start;
        self.loop_end = end;
        true
    }

    /// Get loop region (start, end) in seconds
    pub fn loop_region(&self) -> (f64, f64) {
        (self.loop_start, self.loop_end)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
