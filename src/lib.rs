// Studio Sequencer - Library exports for tests and benchmarks

pub mod command;
pub mod config;
pub mod messaging;
pub mod project;
pub mod sequencer;
pub mod session;
pub mod synth;

// Re-export commonly used types for convenience
pub use command::{CommandManager, SequencerState, UndoableCommand};
pub use config::SequencerConfig;
pub use messaging::notification::{Notification, NotificationCategory, NotificationLevel};
pub use project::{FileStore, FsStore, MemoryStore, ProjectError, ProjectManager};
pub use sequencer::{
    Arrangement, Clip, ClipId, Clock, InstanceId, ManualClock, Note, NoteId, PlaybackScheduler,
    Quantizer, SnapMode, SystemClock, Tempo, Transport, TransportState,
};
pub use session::Session;
pub use synth::engine::{LoggingEngine, RecordingEngine, SynthEngine, VoiceId};
