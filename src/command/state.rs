// SequencerState - Centralized mutable state of the sequencer
//
// This struct holds every entity that commands can modify: clips (which own their notes
// and automation) and the arrangement (tracks and clip instances). Placement operations
// snap their start times through the quantizer.

use crate::command::trait_def::{CommandError, CommandResult};
use crate::sequencer::arrangement::{Arrangement, InstanceId};
use crate::sequencer::clip::{Clip, ClipId, DEFAULT_CLIP_DURATION};
use crate::sequencer::ids::IdGenerator;
use crate::sequencer::note::{Note, NoteId};
use crate::sequencer::timeline::Quantizer;

/// Deep copy of the undo-worthy part of the state
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    clips: Vec<Clip>,
    arrangement: Arrangement,
}

/// Central state of the sequencer that can be modified by commands
#[derive(Debug, Clone)]
pub struct SequencerState {
    /// Clip pool, in creation order
    pub clips: Vec<Clip>,

    /// Tracks and clip instances
    pub arrangement: Arrangement,

    /// Entity ID counter (clips, notes, tracks, instances). Not part of undo snapshots so
    /// IDs handed out before an undo are never reused.
    pub ids: IdGenerator,

    /// Snap grid applied to note and instance placement
    pub quantizer: Quantizer,

    /// Duration given to new empty clips
    pub default_clip_duration: f64,
}

impl SequencerState {
    pub fn new(quantizer: Quantizer) -> Self {
        Self {
            clips: Vec::new(),
            arrangement: Arrangement::new(),
            ids: IdGenerator::new(),
            quantizer,
            default_clip_duration: DEFAULT_CLIP_DURATION,
        }
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            clips: self.clips.clone(),
            arrangement: self.arrangement.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: ModelSnapshot) {
        self.clips = snapshot.clips;
        self.arrangement = snapshot.arrangement;
    }

    /// Drop every clip, track and instance
    pub fn clear(&mut self) {
        self.clips.clear();
        self.arrangement = Arrangement::new();
    }

    fn snap(&self, time: f64) -> f64 {
        self.quantizer.snap(time).max(0.0)
    }

    // ---- Clips ----

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    fn require_clip_mut(&mut self, clip_id: ClipId) -> CommandResult<&mut Clip> {
        self.clip_mut(clip_id)
            .ok_or(CommandError::ClipNotFound(clip_id))
    }

    /// Create an empty clip with the default duration
    pub fn create_clip(
        &mut self,
        name: &str,
        synth_name: &str,
        param_names: Vec<String>,
    ) -> CommandResult<ClipId> {
        if !(self.default_clip_duration > 0.0) {
            return Err(CommandError::InvalidArgument(format!(
                "default clip duration {} must be > 0",
                self.default_clip_duration
            )));
        }
        let id = self.ids.next_id();
        self.clips.push(Clip::new(
            id,
            name,
            synth_name,
            param_names,
            self.default_clip_duration,
        ));
        Ok(id)
    }

    /// Adopt a clip built elsewhere (e.g., loaded from a file). Its IDs are reserved.
    pub fn insert_clip(&mut self, clip: Clip) -> ClipId {
        self.ids.reserve(clip.id);
        for note in clip.notes() {
            self.ids.reserve(note.id);
        }
        let id = clip.id;
        self.clips.push(clip);
        id
    }

    /// Delete a clip together with every instance that references it
    pub fn delete_clip(&mut self, clip_id: ClipId) -> CommandResult<Clip> {
        let index = self
            .clips
            .iter()
            .position(|c| c.id == clip_id)
            .ok_or(CommandError::ClipNotFound(clip_id))?;
        let clip = self.clips.remove(index);
        let removed = self.arrangement.remove_instances_of_clip(clip_id);
        if removed > 0 {
            log::debug!("Deleted clip {} and {} instances", clip_id, removed);
        }
        Ok(clip)
    }

    /// Deep copy a clip under a new identity
    pub fn duplicate_clip(&mut self, clip_id: ClipId) -> CommandResult<ClipId> {
        let source = self
            .clip(clip_id)
            .ok_or(CommandError::ClipNotFound(clip_id))?
            .clone();
        let id = self.ids.next_id();
        let ids = &mut self.ids;
        let copy = source.duplicate(id, format!("{} (copy)", source.name), || ids.next_id());
        self.clips.push(copy);
        Ok(id)
    }

    pub fn rename_clip(&mut self, clip_id: ClipId, name: &str) -> CommandResult<()> {
        let clip = self.require_clip_mut(clip_id)?;
        clip.name = name.to_string();
        clip.mark_dirty();
        Ok(())
    }

    /// Set a clip's duration (never below its content end)
    pub fn set_clip_duration(&mut self, clip_id: ClipId, duration: f64) -> CommandResult<()> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(CommandError::InvalidArgument(format!(
                "clip duration {} must be > 0",
                duration
            )));
        }
        self.require_clip_mut(clip_id)?.set_duration(duration);
        Ok(())
    }

    // ---- Notes ----

    /// Add a note to a clip. The start is snapped; synth and parameter names come from the clip.
    pub fn add_note(
        &mut self,
        clip_id: ClipId,
        start_time: f64,
        duration: f64,
        params: Vec<f64>,
    ) -> CommandResult<NoteId> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(CommandError::InvalidArgument(format!(
                "note duration {} must be > 0",
                duration
            )));
        }
        let start_time = self.snap(start_time);
        let note_id = self.ids.next_id();
        let clip = self.require_clip_mut(clip_id)?;
        let note = Note::new(
            note_id,
            clip.synth_name.clone(),
            start_time,
            duration,
            params,
            clip.param_names.clone(),
        );
        clip.add_note(note);
        Ok(note_id)
    }

    pub fn move_note(&mut self, clip_id: ClipId, note_id: NoteId, start_time: f64) -> CommandResult<()> {
        let start_time = self.snap(start_time);
        if self.require_clip_mut(clip_id)?.move_note(note_id, start_time) {
            Ok(())
        } else {
            Err(CommandError::NoteNotFound { clip_id, note_id })
        }
    }

    pub fn resize_note(&mut self, clip_id: ClipId, note_id: NoteId, duration: f64) -> CommandResult<()> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(CommandError::InvalidArgument(format!(
                "note duration {} must be > 0",
                duration
            )));
        }
        if self.require_clip_mut(clip_id)?.resize_note(note_id, duration) {
            Ok(())
        } else {
            Err(CommandError::NoteNotFound { clip_id, note_id })
        }
    }

    pub fn delete_note(&mut self, clip_id: ClipId, note_id: NoteId) -> CommandResult<Note> {
        self.require_clip_mut(clip_id)?
            .remove_note(note_id)
            .ok_or(CommandError::NoteNotFound { clip_id, note_id })
    }

    pub fn set_note_param(
        &mut self,
        clip_id: ClipId,
        note_id: NoteId,
        index: usize,
        value: f64,
    ) -> CommandResult<()> {
        if self.require_clip_mut(clip_id)?.set_note_param(note_id, index, value) {
            Ok(())
        } else {
            Err(CommandError::NoteNotFound { clip_id, note_id })
        }
    }

    pub fn set_note_muted(&mut self, clip_id: ClipId, note_id: NoteId, muted: bool) -> CommandResult<()> {
        if self.require_clip_mut(clip_id)?.set_note_muted(note_id, muted) {
            Ok(())
        } else {
            Err(CommandError::NoteNotFound { clip_id, note_id })
        }
    }

    pub fn quantize_clip(&mut self, clip_id: ClipId) -> CommandResult<()> {
        let quantizer = self.quantizer;
        self.require_clip_mut(clip_id)?.quantize_all(&quantizer);
        Ok(())
    }

    // ---- Automation ----

    pub fn add_automation_point(
        &mut self,
        clip_id: ClipId,
        param_name: &str,
        time: f64,
        value: f64,
    ) -> CommandResult<usize> {
        Ok(self
            .require_clip_mut(clip_id)?
            .add_automation_point(param_name, time, value))
    }

    pub fn move_automation_point(
        &mut self,
        clip_id: ClipId,
        param_name: &str,
        index: usize,
        time: f64,
        value: f64,
    ) -> CommandResult<usize> {
        self.require_clip_mut(clip_id)?
            .move_automation_point(param_name, index, time, value)
            .ok_or_else(|| CommandError::AutomationPointNotFound {
                clip_id,
                param_name: param_name.to_string(),
                index,
            })
    }

    pub fn remove_automation_point(
        &mut self,
        clip_id: ClipId,
        param_name: &str,
        index: usize,
    ) -> CommandResult<()> {
        if self
            .require_clip_mut(clip_id)?
            .remove_automation_point(param_name, index)
        {
            Ok(())
        } else {
            Err(CommandError::AutomationPointNotFound {
                clip_id,
                param_name: param_name.to_string(),
                index,
            })
        }
    }

    // ---- Tracks ----

    /// Add a track. With a synth name this is idempotent and returns the existing track.
    pub fn add_track(&mut self, name: &str, synth_name: Option<&str>) -> usize {
        match synth_name {
            Some(synth) => match self.arrangement.track_for_synth(synth) {
                Some(index) => index,
                None => {
                    let name = if name.is_empty() { synth } else { name };
                    self.arrangement
                        .push_track(name, Some(synth.to_string()), &mut self.ids)
                }
            },
            None => self.arrangement.push_track(name, None, &mut self.ids),
        }
    }

    pub fn delete_track(&mut self, index: usize) -> CommandResult<()> {
        self.arrangement
            .delete_track(index)
            .map(|_| ())
            .ok_or(CommandError::TrackNotFound(index))
    }

    pub fn set_track_muted(&mut self, index: usize, muted: bool) -> CommandResult<()> {
        if self.arrangement.set_track_muted(index, muted) {
            Ok(())
        } else {
            Err(CommandError::TrackNotFound(index))
        }
    }

    pub fn set_track_solo(&mut self, index: usize, solo: bool) -> CommandResult<()> {
        if self.arrangement.set_track_solo(index, solo) {
            Ok(())
        } else {
            Err(CommandError::TrackNotFound(index))
        }
    }

    // ---- Clip instances ----

    /// Place a clip on a track, growing the track list if needed. The start is snapped.
    pub fn add_clip_instance(
        &mut self,
        clip_id: ClipId,
        track_index: usize,
        start_time: f64,
    ) -> CommandResult<InstanceId> {
        if self.clip(clip_id).is_none() {
            return Err(CommandError::ClipNotFound(clip_id));
        }
        let start_time = self.snap(start_time);
        let id = self
            .arrangement
            .add_clip_instance(clip_id, track_index, start_time, &mut self.ids);
        self.sync_track_lanes(track_index);
        Ok(id)
    }

    /// Move an instance in time and optionally to another (existing) track
    pub fn move_clip_instance(
        &mut self,
        instance_id: InstanceId,
        start_time: f64,
        track_index: Option<usize>,
    ) -> CommandResult<()> {
        let old_track = self
            .arrangement
            .instance(instance_id)
            .map(|i| i.track_index)
            .ok_or(CommandError::InstanceNotFound(instance_id))?;
        let start_time = self.snap(start_time);
        self.arrangement
            .move_clip_instance(instance_id, start_time, track_index);

        let new_track = self
            .arrangement
            .instance(instance_id)
            .map_or(old_track, |i| i.track_index);
        if new_track != old_track {
            self.sync_track_lanes(old_track);
            self.sync_track_lanes(new_track);
        }
        Ok(())
    }

    pub fn delete_clip_instance(&mut self, instance_id: InstanceId) -> CommandResult<()> {
        let instance = self
            .arrangement
            .remove_clip_instance(instance_id)
            .ok_or(CommandError::InstanceNotFound(instance_id))?;
        self.sync_track_lanes(instance.track_index);
        Ok(())
    }

    /// Rebuild a track's automation lanes from the parameters of the clips placed on it
    pub fn sync_track_lanes(&mut self, track_index: usize) {
        let mut names: Vec<String> = Vec::new();
        for instance in self.arrangement.instances_on_track(track_index) {
            let Some(clip) = self.clips.iter().find(|c| c.id == instance.clip_id) else {
                continue;
            };
            for name in &clip.param_names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        if let Some(track) = self.arrangement.track_mut(track_index) {
            track.sync_automation_lanes(&names);
        }
    }

    /// End of the last clip instance on the arrangement
    pub fn arrangement_end(&self) -> f64 {
        self.arrangement
            .instances()
            .iter()
            .filter_map(|i| self.clip(i.clip_id).map(|c| i.start_time + c.duration()))
            .fold(0.0, f64::max)
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new(Quantizer::default())
    }
}
