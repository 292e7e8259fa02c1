// Synthesis engine contract
// The sequencer only triggers, releases and parameterises voices; sound generation
// happens in the external engine

/// Voice identifier allocated by the playback scheduler
pub type VoiceId = u64;

/// Control surface of an external synthesis engine
///
/// `set_voice_param` is always called for every entry of a note's parameter vector before
/// `trigger_voice` for the same voice, so the new voice starts with those values.
pub trait SynthEngine {
    /// Start a voice
    fn trigger_voice(&mut self, voice_id: VoiceId, frequency: f64, amplitude: f64, duration: f64);

    /// Release a voice (start its release stage)
    fn release_voice(&mut self, voice_id: VoiceId);

    /// Set one parameter of a voice
    fn set_voice_param(&mut self, target_id: VoiceId, param_index: usize, value: f64);
}

impl<E: SynthEngine + ?Sized> SynthEngine for &mut E {
    fn trigger_voice(&mut self, voice_id: VoiceId, frequency: f64, amplitude: f64, duration: f64) {
        (**self).trigger_voice(voice_id, frequency, amplitude, duration);
    }

    fn release_voice(&mut self, voice_id: VoiceId) {
        (**self).release_voice(voice_id);
    }

    fn set_voice_param(&mut self, target_id: VoiceId, param_index: usize, value: f64) {
        (**self).set_voice_param(target_id, param_index, value);
    }
}

/// One call made on an engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCall {
    Trigger {
        voice_id: VoiceId,
        frequency: f64,
        amplitude: f64,
        duration: f64,
    },
    Release {
        voice_id: VoiceId,
    },
    SetParam {
        voice_id: VoiceId,
        param_index: usize,
        value: f64,
    },
}

/// Engine that records every call, in order
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Drain the recorded calls
    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    /// Voice IDs passed to `trigger_voice`, in call order
    pub fn triggered(&self) -> Vec<VoiceId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Trigger { voice_id, .. } => Some(*voice_id),
                _ => None,
            })
            .collect()
    }

    /// Voice IDs passed to `release_voice`, in call order
    pub fn released(&self) -> Vec<VoiceId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Release { voice_id } => Some(*voice_id),
                _ => None,
            })
            .collect()
    }

    /// Parameter pushes for one voice as (index, value)
    pub fn params_for(&self, voice: VoiceId) -> Vec<(usize, f64)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::SetParam {
                    voice_id,
                    param_index,
                    value,
                } if *voice_id == voice => Some((*param_index, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl SynthEngine for RecordingEngine {
    fn trigger_voice(&mut self, voice_id: VoiceId, frequency: f64, amplitude: f64, duration: f64) {
        self.calls.push(EngineCall::Trigger {
            voice_id,
            frequency,
            amplitude,
            duration,
        });
    }

    fn release_voice(&mut self, voice_id: VoiceId) {
        self.calls.push(EngineCall::Release { voice_id });
    }

    fn set_voice_param(&mut self, target_id: VoiceId, param_index: usize, value: f64) {
        self.calls.push(EngineCall::SetParam {
            voice_id: target_id,
            param_index,
            value,
        });
    }
}

/// Engine that only logs; used by the command-line runner
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEngine;

impl SynthEngine for LoggingEngine {
    fn trigger_voice(&mut self, voice_id: VoiceId, frequency: f64, amplitude: f64, duration: f64) {
        log::info!(
            "voice {} on: {:.2} Hz, amp {:.2}, {:.3}s",
            voice_id,
            frequency,
            amplitude,
            duration
        );
    }

    fn release_voice(&mut self, voice_id: VoiceId) {
        log::info!("voice {} off", voice_id);
    }

    fn set_voice_param(&mut self, target_id: VoiceId, param_index: usize, value: f64) {
        log::trace!("voice {} param[{}] = {}", target_id, param_index, value);
    }
}
