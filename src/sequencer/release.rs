// Deferred voice releases
// One timer per voice, due at an absolute wall-clock time

use crate::synth::engine::VoiceId;
use std::collections::HashMap;

/// Pending release timers keyed by voice ID
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: HashMap<VoiceId, f64>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or reschedule) the release of `voice_id` at wall-clock `due_at`
    pub fn schedule(&mut self, voice_id: VoiceId, due_at: f64) {
        self.pending.insert(voice_id, due_at);
    }

    /// Cancel a pending release. Returns false if none was scheduled.
    pub fn cancel(&mut self, voice_id: VoiceId) -> bool {
        self.pending.remove(&voice_id).is_some()
    }

    pub fn is_scheduled(&self, voice_id: VoiceId) -> bool {
        self.pending.contains_key(&voice_id)
    }

    /// Remove and return every voice due at or before `now`, earliest first
    pub fn take_due(&mut self, now: f64) -> Vec<VoiceId> {
        let mut due: Vec<(VoiceId, f64)> = self
            .pending
            .iter()
            .filter(|(_, due_at)| **due_at <= now)
            .map(|(voice_id, due_at)| (*voice_id, *due_at))
            .collect();
        due.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        for (voice_id, _) in &due {
            self.pending.remove(voice_id);
        }
        due.into_iter().map(|(voice_id, _)| voice_id).collect()
    }

    /// Earliest due time, useful for hosts arming a one-shot timer
    pub fn next_due(&self) -> Option<f64> {
        self.pending.values().copied().reduce(f64::min)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
