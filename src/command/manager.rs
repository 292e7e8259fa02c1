// CommandManager - Manages undo/redo stacks

use crate::command::state::{ModelSnapshot, SequencerState};
use crate::command::trait_def::{CommandResult, UndoableCommand};
use std::collections::VecDeque;

/// Default maximum number of snapshots to keep in history
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// One history step: the model as it was before a command ran
#[derive(Debug, Clone)]
struct HistoryEntry {
    description: String,
    snapshot: ModelSnapshot,
}

/// Manages command execution and undo/redo functionality
///
/// The CommandManager maintains two stacks of model snapshots:
/// - Undo stack: states before each executed command
/// - Redo stack: states replaced by undo
///
/// When a new command is executed:
/// 1. Snapshot the model
/// 2. Execute the command (restoring the snapshot if it fails)
/// 3. Push the snapshot onto the undo stack
/// 4. Clear the redo stack (since we're on a new timeline)
///
/// # Memory Management
/// The undo stack is bounded; when the limit is reached the oldest snapshot is dropped.
#[derive(Debug)]
pub struct CommandManager {
    /// Most recent at the back
    undo_stack: VecDeque<HistoryEntry>,

    /// Most recent at the back
    redo_stack: VecDeque<HistoryEntry>,

    /// Maximum number of entries to keep in history
    max_history: usize,
}

impl CommandManager {
    /// Create a new CommandManager with default settings
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    /// Create a new CommandManager with a custom history limit
    pub fn with_capacity(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Execute a command and record the previous state for undo
    ///
    /// The caller keeps ownership of the command so it can read back created IDs.
    ///
    /// # Errors
    /// Returns the command's error. The state is rolled back and history is left untouched.
    pub fn execute(
        &mut self,
        command: &mut dyn UndoableCommand,
        state: &mut SequencerState,
    ) -> CommandResult<()> {
        let snapshot = state.snapshot();

        if let Err(e) = command.execute(state) {
            state.restore(snapshot);
            return Err(e);
        }

        self.push_undo(HistoryEntry {
            description: command.description(),
            snapshot,
        });

        // Clear redo stack (we're on a new timeline now)
        self.redo_stack.clear();

        Ok(())
    }

    /// Record the current state as an undo step for a mutation applied outside of a command
    pub fn checkpoint(&mut self, description: impl Into<String>, state: &SequencerState) {
        self.push_undo(HistoryEntry {
            description: description.into(),
            snapshot: state.snapshot(),
        });
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);

        // Trim history if needed
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
    }

    /// Undo the last command
    ///
    /// Returns the description of the undone command, or `None` if there was nothing to undo.
    pub fn undo(&mut self, state: &mut SequencerState) -> Option<String> {
        let entry = self.undo_stack.pop_back()?;

        self.redo_stack.push_back(HistoryEntry {
            description: entry.description.clone(),
            snapshot: state.snapshot(),
        });
        state.restore(entry.snapshot);

        log::debug!("Undo: {}", entry.description);
        Some(entry.description)
    }

    /// Redo the last undone command
    ///
    /// Returns the description of the redone command, or `None` if there was nothing to redo.
    pub fn redo(&mut self, state: &mut SequencerState) -> Option<String> {
        let entry = self.redo_stack.pop_back()?;

        self.push_undo(HistoryEntry {
            description: entry.description.clone(),
            snapshot: state.snapshot(),
        });
        state.restore(entry.snapshot);

        log::debug!("Redo: {}", entry.description);
        Some(entry.description)
    }

    /// Check if there are commands that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if there are commands that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get a description of the command that would be undone
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get a description of the command that would be redone
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// Clear all command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get the number of entries in the undo stack
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of entries in the redo stack
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}
