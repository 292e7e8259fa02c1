// Command Pattern for Undo/Redo functionality
//
// Every undo-worthy edit of the sequencer model goes through an UndoableCommand.
//
// Architecture:
// - UndoableCommand trait: execute() and description()
// - SequencerState: clips, arrangement and the ID counter the commands mutate
// - CommandManager: snapshot-based undo/redo stacks (deep copies of clips and arrangement)
// - Concrete commands: AddNoteCommand, MoveClipInstanceCommand, DeleteTrackCommand, etc.
//
// Selection changes bypass this module: they are not undo-worthy.

pub mod commands;
pub mod manager;
pub mod state;
pub mod trait_def;

pub use manager::CommandManager;
pub use state::{ModelSnapshot, SequencerState};
pub use trait_def::{CommandError, CommandResult, UndoableCommand};
