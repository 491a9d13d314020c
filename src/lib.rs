//! Soundscape - Procedural Ambient Noise Synth
//!
//! Generates pink noise, rain and fireplace textures in real time, mixes any
//! subset of them at independent volumes, and fades the whole mix out to
//! silence over a chosen duration before stopping.
//!
//! # Architecture
//!
//! Two sides share one lock-free track registry:
//! - Render side: a [`dsp::Mixer`] owned by the audio output pulls blocks
//! - Control side: a [`SoundscapeEngine`] edits tracks, runs the lifecycle
//!   (Idle -> Playing -> FadingOut -> Idle) and publishes status

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::{EngineConfig, TrackConfig};
pub use dsp::NoiseKind;
pub use engine::{EngineEvent, EngineStatus, Interruption, PlaybackState, SoundscapeEngine, TrackId};
pub use error::{Result, SoundscapeError};
