// Sequencer Player - Reads the arrangement and triggers voices
// Turns a half-open playhead window into trigger calls, with deferred releases

use crate::sequencer::arrangement::{Arrangement, ClipInstance, InstanceId};
use crate::sequencer::clip::{Clip, ClipId};
use crate::sequencer::note::{Note, NoteId};
use crate::sequencer::release::ReleaseQueue;
use crate::synth::engine::{SynthEngine, VoiceId};

/// A voice triggered by the player and not yet released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingVoice {
    pub voice_id: VoiceId,
    pub instance_id: InstanceId,
    pub clip_id: ClipId,
    pub note_id: NoteId,
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub triggered: usize,
    pub released: usize,
    pub wrapped: bool,
}

/// Playback scheduler - converts clip instance notes to engine calls
///
/// Each note is released by a timer scheduled when it is triggered; the sounding set is
/// only consulted to avoid double triggers and to flush everything on stop, pause, seek
/// and loop wrap.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    /// Voices currently sounding (waiting for release)
    sounding: Vec<SoundingVoice>,

    /// Deferred releases keyed by voice
    releases: ReleaseQueue,

    next_voice_id: VoiceId,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            sounding: Vec::new(),
            releases: ReleaseQueue::new(),
            next_voice_id: 1,
        }
    }

    fn allocate_voice_id(&mut self) -> VoiceId {
        let id = self.next_voice_id;
        self.next_voice_id += 1;
        id
    }

    /// Process the trigger window `[prev_time, current_time)`
    ///
    /// `now` is the wall-clock time used to schedule releases.
    pub fn process<E: SynthEngine + ?Sized>(
        &mut self,
        arrangement: &Arrangement,
        clips: &[Clip],
        prev_time: f64,
        current_time: f64,
        now: f64,
        engine: &mut E,
    ) -> TickReport {
        let mut report = TickReport::default();

        // Existing voices first so freshly triggered ones are not pushed twice
        self.apply_automation(arrangement, clips, current_time, engine);

        if current_time > prev_time {
            for instance in arrangement.instances() {
                if !arrangement.is_track_audible(instance.track_index) {
                    continue;
                }
                let Some(clip) = find_clip(clips, instance.clip_id) else {
                    log::warn!(
                        "Clip instance {} references missing clip {}",
                        instance.id,
                        instance.clip_id
                    );
                    continue;
                };

                // Notes are sorted by start time: only scan those inside the window
                let notes = clip.notes();
                let first = notes
                    .partition_point(|n| instance.start_time + n.start_time < prev_time);

                for note in &notes[first..] {
                    let absolute_start = instance.start_time + note.start_time;
                    if absolute_start >= current_time {
                        break;
                    }
                    if note.muted || self.is_sounding(instance.id, note.id) {
                        continue;
                    }
                    self.trigger(instance, clip, note, absolute_start, current_time, now, engine);
                    report.triggered += 1;
                }
            }
        }

        report.released = self.poll_releases(now, engine);
        report
    }

    fn trigger<E: SynthEngine + ?Sized>(
        &mut self,
        instance: &ClipInstance,
        clip: &Clip,
        note: &Note,
        absolute_start: f64,
        current_time: f64,
        now: f64,
        engine: &mut E,
    ) {
        let voice_id = self.allocate_voice_id();

        for (index, value) in note.params().iter().enumerate() {
            let value = param_name(clip, note, index)
                .and_then(|name| clip.automation_value_at(name, note.start_time))
                .unwrap_or(*value);
            engine.set_voice_param(voice_id, index, value);
        }
        engine.trigger_voice(voice_id, note.frequency, note.amplitude, note.duration);

        self.sounding.push(SoundingVoice {
            voice_id,
            instance_id: instance.id,
            clip_id: clip.id,
            note_id: note.id,
        });

        // Stalled hosts can hand us a window past the note end: release immediately
        let absolute_end = absolute_start + note.duration;
        let delay = (absolute_end - current_time).max(0.0);
        self.releases.schedule(voice_id, now + delay);

        log::trace!(
            "trigger voice {} (instance {}, note {}) at {:.3}s, release in {:.3}s",
            voice_id,
            instance.id,
            note.id,
            absolute_start,
            delay
        );
    }

    /// Push automation values for every sounding voice whose clip has curves
    fn apply_automation<E: SynthEngine + ?Sized>(
        &self,
        arrangement: &Arrangement,
        clips: &[Clip],
        current_time: f64,
        engine: &mut E,
    ) {
        for voice in &self.sounding {
            let Some(clip) = find_clip(clips, voice.clip_id) else {
                continue;
            };
            if clip.automation().is_empty() {
                continue;
            }
            let (Some(instance), Some(note)) = (
                arrangement.instance(voice.instance_id),
                clip.get_note(voice.note_id),
            ) else {
                continue;
            };

            let clip_time = current_time - instance.start_time;
            for curve in clip.automation() {
                let index = note
                    .param_index(curve.param_name())
                    .or_else(|| clip.param_names.iter().position(|n| n == curve.param_name()));
                if let (Some(index), Some(value)) = (index, curve.value_at(clip_time)) {
                    engine.set_voice_param(voice.voice_id, index, value);
                }
            }
        }
    }

    /// Fire every release timer due at or before `now`
    pub fn poll_releases<E: SynthEngine + ?Sized>(&mut self, now: f64, engine: &mut E) -> usize {
        let due = self.releases.take_due(now);
        for voice_id in &due {
            self.sounding.retain(|v| v.voice_id != *voice_id);
            engine.release_voice(*voice_id);
        }
        due.len()
    }

    /// Release every sounding voice and cancel their timers
    pub fn release_all<E: SynthEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        let count = self.sounding.len();
        for voice in self.sounding.drain(..) {
            self.releases.cancel(voice.voice_id);
            engine.release_voice(voice.voice_id);
        }
        self.releases.clear();
        if count > 0 {
            log::debug!("Force-released {} voices", count);
        }
        count
    }

    /// Check if a note of a given instance is sounding
    pub fn is_sounding(&self, instance_id: InstanceId, note_id: NoteId) -> bool {
        self.sounding
            .iter()
            .any(|v| v.instance_id == instance_id && v.note_id == note_id)
    }

    pub fn sounding_voices(&self) -> &[SoundingVoice] {
        &self.sounding
    }

    pub fn sounding_count(&self) -> usize {
        self.sounding.len()
    }

    pub fn pending_releases(&self) -> &ReleaseQueue {
        &self.releases
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn find_clip(clips: &[Clip], clip_id: ClipId) -> Option<&Clip> {
    clips.iter().find(|c| c.id == clip_id)
}

fn param_name<'a>(clip: &'a Clip, note: &'a Note, index: usize) -> Option<&'a str> {
    note.param_names
        .get(index)
        .or_else(|| clip.param_names.get(index))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ids::IdGenerator;
    use crate::synth::engine::{EngineCall, RecordingEngine};

    struct Fixture {
        arrangement: Arrangement,
        clips: Vec<Clip>,
        ids: IdGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arrangement: Arrangement::new(),
                clips: Vec::new(),
                ids: IdGenerator::new(),
            }
        }

        fn clip(&mut self, notes: &[(f64, f64)]) -> ClipId {
            let id = self.ids.next_id();
            let mut clip = Clip::new_default(id, "Clip", "sine");
            for (start, duration) in notes {
                let note_id = self.ids.next_id();
                clip.add_note(Note::new(
                    note_id,
                    "sine",
                    *start,
                    *duration,
                    vec![440.0, 0.8, 1000.0],
                    vec!["freq".into(), "amp".into(), "cutoff".into()],
                ));
            }
            self.clips.push(clip);
            id
        }

        fn place(&mut self, clip_id: ClipId, track: usize, start: f64) -> InstanceId {
            self.arrangement
                .add_clip_instance(clip_id, track, start, &mut self.ids)
        }
    }

    #[test]
    fn test_trigger_in_half_open_window() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.5, 0.25)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();

        // Note starting exactly at current_time is deferred
        let report = player.process(&fx.arrangement, &fx.clips, 0.0, 0.5, 0.5, &mut engine);
        assert_eq!(report.triggered, 0);

        let report = player.process(&fx.arrangement, &fx.clips, 0.5, 0.6, 0.6, &mut engine);
        assert_eq!(report.triggered, 1);
        assert_eq!(engine.triggered(), vec![1]);
    }

    #[test]
    fn test_params_pushed_before_trigger() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 0.25)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);

        let calls = engine.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[..3]
            .iter()
            .all(|c| matches!(c, EngineCall::SetParam { voice_id: 1, .. })));
        assert_eq!(
            calls[3],
            EngineCall::Trigger {
                voice_id: 1,
                frequency: 440.0,
                amplitude: 0.8,
                duration: 0.25
            }
        );
    }

    #[test]
    fn test_overlapping_window_triggers_once() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.1, 1.0)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.2, 0.2, &mut engine);
        player.process(&fx.arrangement, &fx.clips, 0.05, 0.3, 0.3, &mut engine);

        assert_eq!(engine.triggered().len(), 1);
        assert_eq!(player.sounding_count(), 1);
    }

    #[test]
    fn test_deferred_release_fires_once() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 0.5)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();

        // Triggered at wall 0.1 with playhead 0.1: release due at 0.1 + 0.4
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);
        assert_eq!(player.poll_releases(0.45, &mut engine), 0);
        assert_eq!(player.poll_releases(0.5, &mut engine), 1);
        assert_eq!(player.poll_releases(2.0, &mut engine), 0);

        assert_eq!(engine.released(), vec![1]);
        assert_eq!(player.sounding_count(), 0);
    }

    #[test]
    fn test_stalled_window_releases_immediately_after_trigger() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 0.1)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        let report = player.process(&fx.arrangement, &fx.clips, 0.0, 5.0, 5.0, &mut engine);

        assert_eq!(report.triggered, 1);
        assert_eq!(report.released, 1);
        let calls = engine.calls();
        assert!(matches!(calls[calls.len() - 2], EngineCall::Trigger { .. }));
        assert_eq!(calls[calls.len() - 1], EngineCall::Release { voice_id: 1 });
    }

    #[test]
    fn test_release_all_cancels_timers() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 1.0), (0.05, 1.0)]);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);
        assert_eq!(player.sounding_count(), 2);

        assert_eq!(player.release_all(&mut engine), 2);
        assert!(player.pending_releases().is_empty());

        // The cancelled timers must not fire a second release
        assert_eq!(player.poll_releases(10.0, &mut engine), 0);
        assert_eq!(engine.released(), vec![1, 2]);
    }

    #[test]
    fn test_muted_note_and_track_are_skipped() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 0.5), (0.0, 0.5)]);
        let muted_note = fx.clips[0].notes()[1].id;
        fx.clips[0].set_note_muted(muted_note, true);
        fx.place(clip, 0, 0.0);
        fx.place(clip, 1, 0.0);
        fx.arrangement.set_track_muted(1, true);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        let report = player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);

        assert_eq!(report.triggered, 1);
    }

    #[test]
    fn test_shared_clip_plays_per_instance() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 0.5)]);
        fx.place(clip, 0, 0.0);
        fx.place(clip, 1, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);

        assert_eq!(engine.triggered(), vec![1, 2]);
    }

    #[test]
    fn test_automation_overrides_and_follows_playhead() {
        let mut fx = Fixture::new();
        let clip = fx.clip(&[(0.0, 2.0)]);
        fx.clips[0].add_automation_point("cutoff", 0.0, 100.0);
        fx.clips[0].add_automation_point("cutoff", 2.0, 300.0);
        fx.place(clip, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        player.process(&fx.arrangement, &fx.clips, 0.0, 0.1, 0.1, &mut engine);
        assert_eq!(engine.params_for(1)[2], (2, 100.0));

        engine.clear();
        player.process(&fx.arrangement, &fx.clips, 0.1, 1.0, 1.0, &mut engine);
        assert_eq!(engine.params_for(1), vec![(2, 200.0)]);
    }

    #[test]
    fn test_missing_clip_is_skipped() {
        let mut fx = Fixture::new();
        fx.place(999, 0, 0.0);

        let mut player = PlaybackScheduler::new();
        let mut engine = RecordingEngine::new();
        let report = player.process(&fx.arrangement, &fx.clips, 0.0, 1.0, 1.0, &mut engine);
        assert_eq!(report.triggered, 0);
        assert!(engine.calls().is_empty());
    }
}
