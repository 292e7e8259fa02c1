// Concrete command implementations
//
// One command per undo-worthy edit. Commands that create an entity keep its ID so the caller
// can read it back after execution.

use crate::command::state::SequencerState;
use crate::command::trait_def::{CommandResult, UndoableCommand};
use crate::sequencer::arrangement::InstanceId;
use crate::sequencer::clip::ClipId;
use crate::sequencer::note::NoteId;

// ---- Clips ----

/// Command to create an empty clip
pub struct CreateClipCommand {
    name: String,
    synth_name: String,
    param_names: Vec<String>,
    created: Option<ClipId>,
}

impl CreateClipCommand {
    pub fn new(name: &str, synth_name: &str, param_names: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            synth_name: synth_name.to_string(),
            param_names,
            created: None,
        }
    }

    /// ID of the clip created by the last execution
    pub fn clip_id(&self) -> Option<ClipId> {
        self.created
    }
}

impl UndoableCommand for CreateClipCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.created = Some(state.create_clip(
            &self.name,
            &self.synth_name,
            self.param_names.clone(),
        )?);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Create Clip {}", self.name)
    }
}

/// Command to delete a clip and every instance of it
pub struct DeleteClipCommand {
    clip_id: ClipId,
}

impl DeleteClipCommand {
    pub fn new(clip_id: ClipId) -> Self {
        Self { clip_id }
    }
}

impl UndoableCommand for DeleteClipCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.delete_clip(self.clip_id).map(|_| ())
    }

    fn description(&self) -> String {
        "Delete Clip".to_string()
    }
}

/// Command to duplicate a clip (fresh IDs, not placed anywhere)
pub struct DuplicateClipCommand {
    clip_id: ClipId,
    created: Option<ClipId>,
}

impl DuplicateClipCommand {
    pub fn new(clip_id: ClipId) -> Self {
        Self {
            clip_id,
            created: None,
        }
    }

    pub fn clip_id(&self) -> Option<ClipId> {
        self.created
    }
}

impl UndoableCommand for DuplicateClipCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.created = Some(state.duplicate_clip(self.clip_id)?);
        Ok(())
    }

    fn description(&self) -> String {
        "Duplicate Clip".to_string()
    }
}

pub struct RenameClipCommand {
    clip_id: ClipId,
    name: String,
}

impl RenameClipCommand {
    pub fn new(clip_id: ClipId, name: &str) -> Self {
        Self {
            clip_id,
            name: name.to_string(),
        }
    }
}

impl UndoableCommand for RenameClipCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.rename_clip(self.clip_id, &self.name)
    }

    fn description(&self) -> String {
        format!("Rename Clip to {}", self.name)
    }
}

pub struct SetClipDurationCommand {
    clip_id: ClipId,
    duration: f64,
}

impl SetClipDurationCommand {
    pub fn new(clip_id: ClipId, duration: f64) -> Self {
        Self { clip_id, duration }
    }
}

impl UndoableCommand for SetClipDurationCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.set_clip_duration(self.clip_id, self.duration)
    }

    fn description(&self) -> String {
        format!("Set Clip Duration to {:.3}s", self.duration)
    }
}

// ---- Notes ----

/// Command to add a note (start snapped to the grid)
pub struct AddNoteCommand {
    clip_id: ClipId,
    start_time: f64,
    duration: f64,
    params: Vec<f64>,
    created: Option<NoteId>,
}

impl AddNoteCommand {
    pub fn new(clip_id: ClipId, start_time: f64, duration: f64, params: Vec<f64>) -> Self {
        Self {
            clip_id,
            start_time,
            duration,
            params,
            created: None,
        }
    }

    pub fn note_id(&self) -> Option<NoteId> {
        self.created
    }
}

impl UndoableCommand for AddNoteCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.created = Some(state.add_note(
            self.clip_id,
            self.start_time,
            self.duration,
            self.params.clone(),
        )?);
        Ok(())
    }

    fn description(&self) -> String {
        "Add Note".to_string()
    }
}

pub struct MoveNoteCommand {
    clip_id: ClipId,
    note_id: NoteId,
    start_time: f64,
}

impl MoveNoteCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId, start_time: f64) -> Self {
        Self {
            clip_id,
            note_id,
            start_time,
        }
    }
}

impl UndoableCommand for MoveNoteCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.move_note(self.clip_id, self.note_id, self.start_time)
    }

    fn description(&self) -> String {
        "Move Note".to_string()
    }
}

pub struct ResizeNoteCommand {
    clip_id: ClipId,
    note_id: NoteId,
    duration: f64,
}

impl ResizeNoteCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId, duration: f64) -> Self {
        Self {
            clip_id,
            note_id,
            duration,
        }
    }
}

impl UndoableCommand for ResizeNoteCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.resize_note(self.clip_id, self.note_id, self.duration)
    }

    fn description(&self) -> String {
        "Resize Note".to_string()
    }
}

pub struct DeleteNoteCommand {
    clip_id: ClipId,
    note_id: NoteId,
}

impl DeleteNoteCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId) -> Self {
        Self { clip_id, note_id }
    }
}

impl UndoableCommand for DeleteNoteCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.delete_note(self.clip_id, self.note_id).map(|_| ())
    }

    fn description(&self) -> String {
        "Delete Note".to_string()
    }
}

/// Command to set one entry of a note's parameter vector
pub struct SetNoteParamCommand {
    clip_id: ClipId,
    note_id: NoteId,
    index: usize,
    value: f64,
}

impl SetNoteParamCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId, index: usize, value: f64) -> Self {
        Self {
            clip_id,
            note_id,
            index,
            value,
        }
    }
}

impl UndoableCommand for SetNoteParamCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.set_note_param(self.clip_id, self.note_id, self.index, self.value)
    }

    fn description(&self) -> String {
        format!("Set Note Param {} to {:.3}", self.index, self.value)
    }
}

pub struct SetNoteMutedCommand {
    clip_id: ClipId,
    note_id: NoteId,
    muted: bool,
}

impl SetNoteMutedCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId, muted: bool) -> Self {
        Self {
            clip_id,
            note_id,
            muted,
        }
    }
}

impl UndoableCommand for SetNoteMutedCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.set_note_muted(self.clip_id, self.note_id, self.muted)
    }

    fn description(&self) -> String {
        if self.muted {
            "Mute Note".to_string()
        } else {
            "Unmute Note".to_string()
        }
    }
}

pub struct QuantizeClipCommand {
    clip_id: ClipId,
}

impl QuantizeClipCommand {
    pub fn new(clip_id: ClipId) -> Self {
        Self { clip_id }
    }
}

impl UndoableCommand for QuantizeClipCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.quantize_clip(self.clip_id)
    }

    fn description(&self) -> String {
        "Quantize Clip".to_string()
    }
}

// ---- Clip instances ----

/// Command to place a clip on a track
pub struct AddClipInstanceCommand {
    clip_id: ClipId,
    track_index: usize,
    start_time: f64,
    created: Option<InstanceId>,
}

impl AddClipInstanceCommand {
    pub fn new(clip_id: ClipId, track_index: usize, start_time: f64) -> Self {
        Self {
            clip_id,
            track_index,
            start_time,
            created: None,
        }
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.created
    }
}

impl UndoableCommand for AddClipInstanceCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.created = Some(state.add_clip_instance(
            self.clip_id,
            self.track_index,
            self.start_time,
        )?);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Place Clip on Track {}", self.track_index + 1)
    }
}

pub struct MoveClipInstanceCommand {
    instance_id: InstanceId,
    start_time: f64,
    track_index: Option<usize>,
}

impl MoveClipInstanceCommand {
    pub fn new(instance_id: InstanceId, start_time: f64, track_index: Option<usize>) -> Self {
        Self {
            instance_id,
            start_time,
            track_index,
        }
    }
}

impl UndoableCommand for MoveClipInstanceCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.move_clip_instance(self.instance_id, self.start_time, self.track_index)
    }

    fn description(&self) -> String {
        "Move Clip".to_string()
    }
}

pub struct DeleteClipInstanceCommand {
    instance_id: InstanceId,
}

impl DeleteClipInstanceCommand {
    pub fn new(instance_id: InstanceId) -> Self {
        Self { instance_id }
    }
}

impl UndoableCommand for DeleteClipInstanceCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.delete_clip_instance(self.instance_id)
    }

    fn description(&self) -> String {
        "Remove Clip from Arrangement".to_string()
    }
}

// ---- Tracks ----

/// Command to add a track; with a synth name the existing track for that synth is reused
pub struct AddTrackCommand {
    name: String,
    synth_name: Option<String>,
    index: Option<usize>,
}

impl AddTrackCommand {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            synth_name: None,
            index: None,
        }
    }

    pub fn for_synth(synth_name: &str) -> Self {
        Self {
            name: synth_name.to_string(),
            synth_name: Some(synth_name.to_string()),
            index: None,
        }
    }

    pub fn track_index(&self) -> Option<usize> {
        self.index
    }
}

impl UndoableCommand for AddTrackCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.index = Some(state.add_track(&self.name, self.synth_name.as_deref()));
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add Track {}", self.name)
    }
}

pub struct DeleteTrackCommand {
    index: usize,
}

impl DeleteTrackCommand {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl UndoableCommand for DeleteTrackCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.delete_track(self.index)
    }

    fn description(&self) -> String {
        format!("Delete Track {}", self.index + 1)
    }
}

pub struct SetTrackMutedCommand {
    index: usize,
    muted: bool,
}

impl SetTrackMutedCommand {
    pub fn new(index: usize, muted: bool) -> Self {
        Self { index, muted }
    }
}

impl UndoableCommand for SetTrackMutedCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.set_track_muted(self.index, self.muted)
    }

    fn description(&self) -> String {
        let verb = if self.muted { "Mute" } else { "Unmute" };
        format!("{} Track {}", verb, self.index + 1)
    }
}

pub struct SetTrackSoloCommand {
    index: usize,
    solo: bool,
}

impl SetTrackSoloCommand {
    pub fn new(index: usize, solo: bool) -> Self {
        Self { index, solo }
    }
}

impl UndoableCommand for SetTrackSoloCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.set_track_solo(self.index, self.solo)
    }

    fn description(&self) -> String {
        let verb = if self.solo { "Solo" } else { "Unsolo" };
        format!("{} Track {}", verb, self.index + 1)
    }
}

// ---- Automation ----

pub struct AddAutomationPointCommand {
    clip_id: ClipId,
    param_name: String,
    time: f64,
    value: f64,
    index: Option<usize>,
}

impl AddAutomationPointCommand {
    pub fn new(clip_id: ClipId, param_name: &str, time: f64, value: f64) -> Self {
        Self {
            clip_id,
            param_name: param_name.to_string(),
            time,
            value,
            index: None,
        }
    }

    /// Index of the inserted point within its curve
    pub fn point_index(&self) -> Option<usize> {
        self.index
    }
}

impl UndoableCommand for AddAutomationPointCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.index = Some(state.add_automation_point(
            self.clip_id,
            &self.param_name,
            self.time,
            self.value,
        )?);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add {} Automation Point", self.param_name)
    }
}

pub struct MoveAutomationPointCommand {
    clip_id: ClipId,
    param_name: String,
    index: usize,
    time: f64,
    value: f64,
    new_index: Option<usize>,
}

impl MoveAutomationPointCommand {
    pub fn new(clip_id: ClipId, param_name: &str, index: usize, time: f64, value: f64) -> Self {
        Self {
            clip_id,
            param_name: param_name.to_string(),
            index,
            time,
            value,
            new_index: None,
        }
    }

    pub fn point_index(&self) -> Option<usize> {
        self.new_index
    }
}

impl UndoableCommand for MoveAutomationPointCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        self.new_index = Some(state.move_automation_point(
            self.clip_id,
            &self.param_name,
            self.index,
            self.time,
            self.value,
        )?);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Move {} Automation Point", self.param_name)
    }
}

pub struct RemoveAutomationPointCommand {
    clip_id: ClipId,
    param_name: String,
    index: usize,
}

impl RemoveAutomationPointCommand {
    pub fn new(clip_id: ClipId, param_name: &str, index: usize) -> Self {
        Self {
            clip_id,
            param_name: param_name.to_string(),
            index,
        }
    }
}

impl UndoableCommand for RemoveAutomationPointCommand {
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
        state.remove_automation_point(self.clip_id, &self.param_name, self.index)
    }

    fn description(&self) -> String {
        format!("Remove {} Automation Point", self.param_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::manager::CommandManager;
    use crate::command::trait_def::CommandError;

    fn create_test_state() -> SequencerState {
        SequencerState::default()
    }

    fn params() -> Vec<String> {
        vec!["freq".into(), "amp".into(), "cutoff".into()]
    }

    #[test]
    fn test_create_clip_command() {
        let mut state = create_test_state();
        let mut cmd = CreateClipCommand::new("Lead", "sine", params());

        assert!(cmd.clip_id().is_none());
        cmd.execute(&mut state).unwrap();

        let id = cmd.clip_id().unwrap();
        assert_eq!(state.clip(id).unwrap().name, "Lead");
        assert_eq!(cmd.description(), "Create Clip Lead");
    }

    #[test]
    fn test_note_edit_undo_redo() {
        let mut state = create_test_state();
        let mut manager = CommandManager::new();

        let mut create = CreateClipCommand::new("Lead", "sine", params());
        manager.execute(&mut create, &mut state).unwrap();
        let clip = create.clip_id().unwrap();

        let mut add = AddNoteCommand::new(clip, 0.5, 0.25, vec![440.0, 0.8, 1000.0]);
        manager.execute(&mut add, &mut state).unwrap();
        let note = add.note_id().unwrap();

        manager
            .execute(&mut MoveNoteCommand::new(clip, note, 1.0), &mut state)
            .unwrap();
        assert_eq!(state.clip(clip).unwrap().get_note(note).unwrap().start_time, 1.0);

        assert_eq!(manager.undo(&mut state).as_deref(), Some("Move Note"));
        assert_eq!(state.clip(clip).unwrap().get_note(note).unwrap().start_time, 0.5);

        manager.redo(&mut state);
        assert_eq!(state.clip(clip).unwrap().get_note(note).unwrap().start_time, 1.0);
    }

    #[test]
    fn test_missing_note_is_not_recorded() {
        let mut state = create_test_state();
        let mut manager = CommandManager::new();

        let mut create = CreateClipCommand::new("Lead", "sine", params());
        manager.execute(&mut create, &mut state).unwrap();
        let clip = create.clip_id().unwrap();

        let result = manager.execute(&mut DeleteNoteCommand::new(clip, 1234), &mut state);
        assert_eq!(
            result,
            Err(CommandError::NoteNotFound {
                clip_id: clip,
                note_id: 1234
            })
        );
        assert_eq!(manager.undo_count(), 1);
    }

    #[test]
    fn test_delete_track_undo_restores_instances() {
        let mut state = create_test_state();
        let mut manager = CommandManager::new();

        let mut create = CreateClipCommand::new("Lead", "sine", params());
        manager.execute(&mut create, &mut state).unwrap();
        let clip = create.clip_id().unwrap();

        for track in 0..3 {
            manager
                .execute(
                    &mut AddClipInstanceCommand::new(clip, track, 0.0),
                    &mut state,
                )
                .unwrap();
        }

        manager
            .execute(&mut DeleteTrackCommand::new(1), &mut state)
            .unwrap();
        let tracks: Vec<usize> = state
            .arrangement
            .instances()
            .iter()
            .map(|i| i.track_index)
            .collect();
        assert_eq!(tracks, vec![0, 1]);

        manager.undo(&mut state);
        assert_eq!(state.arrangement.track_count(), 3);
        assert_eq!(state.arrangement.instances().len(), 3);
    }

    #[test]
    fn test_track_mute_solo_commands() {
        let mut state = create_test_state();
        let mut add = AddTrackCommand::for_synth("bass");
        add.execute(&mut state).unwrap();
        let index = add.track_index().unwrap();

        SetTrackSoloCommand::new(index, true)
            .execute(&mut state)
            .unwrap();
        assert!(state.arrangement.tracks()[index].solo);

        let mut mute = SetTrackMutedCommand::new(index, true);
        mute.execute(&mut state).unwrap();
        assert!(!state.arrangement.is_track_audible(index));
        assert_eq!(mute.description(), "Mute Track 1");

        assert_eq!(
            SetTrackMutedCommand::new(9, true).execute(&mut state),
            Err(CommandError::TrackNotFound(9))
        );
    }

    #[test]
    fn test_automation_point_commands() {
        let mut state = create_test_state();
        let clip = state.create_clip("Pad", "sine", params()).unwrap();

        let mut add = AddAutomationPointCommand::new(clip, "cutoff", 1.0, 0.5);
        add.execute(&mut state).unwrap();
        assert_eq!(add.point_index(), Some(0));

        let mut moved = MoveAutomationPointCommand::new(clip, "cutoff", 0, 50.0, 0.7);
        moved.execute(&mut state).unwrap();
        let curve = state.clip(clip).unwrap().automation_curve("cutoff").unwrap();
        assert_eq!(curve.points()[0].time, 2.0);

        RemoveAutomationPointCommand::new(clip, "cutoff", 0)
            .execute(&mut state)
            .unwrap();
        assert!(state.clip(clip).unwrap().automation().is_empty());

        assert!(matches!(
            RemoveAutomationPointCommand::new(clip, "cutoff", 0).execute(&mut state),
            Err(CommandError::AutomationPointNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_then_undo() {
        let mut state = create_test_state();
        let mut manager = CommandManager::new();
        let clip = state.create_clip("Lead", "sine", params()).unwrap();

        let mut duplicate = DuplicateClipCommand::new(clip);
        manager.execute(&mut duplicate, &mut state).unwrap();
        assert_eq!(state.clips.len(), 2);

        manager.undo(&mut state);
        assert_eq!(state.clips.len(), 1);
        assert!(state.clip(duplicate.clip_id().unwrap()).is_none());
    }
}
