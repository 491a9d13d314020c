//! Soundscape Engine Module
//!
//! Control side of the synth:
//! - Track registry shared with the render stage
//! - Playback state machine and interruption handling
//! - Fade-out planning and the timers that drive it
//! - Audio outputs (offline tap, default device)
//! - WAV export of offline renders

#[cfg(feature = "cpal")]
pub mod cpal_output;
pub mod fade;
pub mod io;
pub mod output;
pub mod registry;
pub mod scheduler;
pub mod soundscape;
pub mod status;
pub mod transport;

#[cfg(feature = "cpal")]
pub use cpal_output::CpalOutput;
pub use fade::FadePlan;
pub use io::{export_wav, read_wav, WavExporter, WavFormat};
pub use output::{AudioOutput, OfflineOutput, RenderTap};
pub use registry::{MixSnapshot, TrackId, TrackRegistry, TrackState};
pub use scheduler::{ManualScheduler, Scheduler, TaskControl, TaskHandle, ThreadScheduler};
pub use soundscape::SoundscapeEngine;
pub use status::{EngineEvent, EngineStatus};
pub use transport::{Interruption, PlaybackState, RouteChangeReason};
