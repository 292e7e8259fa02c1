// UndoableCommand trait definition

use crate::command::state::SequencerState;
use crate::sequencer::arrangement::InstanceId;
use crate::sequencer::clip::ClipId;
use crate::sequencer::note::NoteId;
use thiserror::Error;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur during command execution
///
/// Every variant leaves the model untouched: the command manager restores the snapshot taken
/// before the failing command ran.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Clip {0} not found")]
    ClipNotFound(ClipId),

    #[error("Note {note_id} not found in clip {clip_id}")]
    NoteNotFound { clip_id: ClipId, note_id: NoteId },

    #[error("Clip instance {0} not found")]
    InstanceNotFound(InstanceId),

    #[error("Track {0} not found")]
    TrackNotFound(usize),

    #[error("No automation point {index} on '{param_name}' in clip {clip_id}")]
    AutomationPointNotFound {
        clip_id: ClipId,
        param_name: String,
        index: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Trait for commands that support undo/redo
///
/// Commands only describe the forward mutation. Undo is handled by the `CommandManager`,
/// which snapshots the model before `execute` and restores that snapshot on undo.
///
/// # Example
/// ```no_run
/// use studio_sequencer::command::state::SequencerState;
/// use studio_sequencer::command::trait_def::{CommandResult, UndoableCommand};
/// use studio_sequencer::sequencer::clip::ClipId;
///
/// struct RenameClip {
///     clip_id: ClipId,
///     name: String,
/// }
///
/// impl UndoableCommand for RenameClip {
///     fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()> {
///         state.rename_clip(self.clip_id, &self.name)
///     }
///
///     fn description(&self) -> String {
///         format!("Rename Clip to {}", self.name)
///     }
/// }
/// ```
pub trait UndoableCommand: Send {
    /// Apply the mutation
    ///
    /// On error the manager rolls the state back, so a command may fail halfway.
    fn execute(&mut self, state: &mut SequencerState) -> CommandResult<()>;

    /// Human-readable description (e.g., "Undo: Move Note")
    fn description(&self) -> String;
}
