// Project persistence for the sequencer
// Clips are stored as sequence text files; the arrangement as a JSON document that
// references them by path. All I/O goes through a FileStore.

pub mod document;
pub mod manager;
pub mod sequence_text;
pub mod store;

pub use document::{ArrangementDocument, ClipInstanceDocument, TrackDocument, Viewport};
pub use manager::{LoadReport, ProjectError, ProjectManager, ProjectSettings, SaveReport};
pub use sequence_text::{AutomationEntry, ClipImport, ParseOptions, ParsedSequence, TriggerPair};
pub use store::{FileStore, FsStore, MemoryStore};
