// Synthesis module - contract with the external engine that produces sound

pub mod engine;

pub use engine::{EngineCall, LoggingEngine, RecordingEngine, SynthEngine, VoiceId};
