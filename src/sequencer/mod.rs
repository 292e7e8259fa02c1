// Sequencer module
// Clips, arrangement, transport and the playback scheduler that drives synth voices

pub mod arrangement;
pub mod automation;
pub mod clip;
pub mod clock;
pub mod ids;
pub mod note;
pub mod player;
pub mod release;
pub mod timeline;
pub mod transport;

pub use arrangement::{Arrangement, ArrangementTrack, AutomationLane, ClipInstance, InstanceId, TrackId};
pub use automation::{AutomationCurve, AutomationPoint};
pub use clip::{Clip, ClipId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::IdGenerator;
pub use note::{Note, NoteId};
pub use player::{PlaybackScheduler, SoundingVoice, TickReport};
pub use release::ReleaseQueue;
pub use timeline::{Quantizer, SnapMode, Tempo};
pub use transport::{Advance, Transport, TransportState};
