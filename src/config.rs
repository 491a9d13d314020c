//! Engine and track configuration
//!
//! Track definitions are owned by the surrounding application; only
//! `{id, kind, volume, enabled}` matter to the engine. Both track lists and
//! engine settings can be read from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::NoiseKind;
use crate::engine::registry::TrackId;
use crate::error::{Result, SoundscapeError};

/// Default output sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default output channel count (mono mix replicated to stereo)
pub const DEFAULT_CHANNELS: u16 = 2;

/// Default frames per render block for offline hosts
pub const DEFAULT_BLOCK_FRAMES: usize = 512;

/// Default number of discrete fade-out steps
pub const DEFAULT_FADE_STEPS: u32 = 40;

/// Default fade-out length offered to users (minutes)
pub const DEFAULT_FADE_MINUTES: f64 = 30.0;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 192_000;
const MAX_CHANNELS: u16 = 8;
const MAX_BLOCK_FRAMES: usize = 16_384;

// ============================================================================
// Engine Config
// ============================================================================

/// Settings for one engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count
    pub channels: u16,
    /// Frames per block when the host lets us choose
    pub block_frames: usize,
    /// Number of discrete fade-out volume steps
    pub fade_steps: u32,
    /// Fixed noise seed for reproducible renders (random when absent)
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            block_frames: DEFAULT_BLOCK_FRAMES,
            fade_steps: DEFAULT_FADE_STEPS,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Same settings with a fixed noise seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load settings from a JSON file, then validate them
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is within the range the engine supports
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(SoundscapeError::Config {
                reason: format!(
                    "sample rate {} Hz outside {}..={}",
                    self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                ),
            });
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SoundscapeError::Config {
                reason: format!("channel count {} outside 1..={}", self.channels, MAX_CHANNELS),
            });
        }
        if self.block_frames == 0 || self.block_frames > MAX_BLOCK_FRAMES {
            return Err(SoundscapeError::Config {
                reason: format!(
                    "block size {} frames outside 1..={}",
                    self.block_frames, MAX_BLOCK_FRAMES
                ),
            });
        }
        if self.fade_steps == 0 {
            return Err(SoundscapeError::Config {
                reason: "fade needs at least one step".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Track Config
// ============================================================================

/// One track definition as supplied by the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackConfig {
    /// Fresh id when the file omits one
    #[serde(default)]
    pub id: TrackId,
    pub kind: NoiseKind,
    pub volume: f32,
    #[serde(alias = "isEnabled")]
    pub enabled: bool,
    /// Display title; never reaches the engine's track state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TrackConfig {
    /// New untitled track with a fresh id
    pub fn new(kind: NoiseKind, volume: f32, enabled: bool) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            volume,
            enabled,
            title: None,
        }
    }

    /// Attach a display title
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The stock three-track soundscape: pink noise on, rain and fireplace off
    pub fn default_soundscape() -> Vec<TrackConfig> {
        vec![
            TrackConfig::new(NoiseKind::PinkNoise, 0.7, true).titled("Pink Noise"),
            TrackConfig::new(NoiseKind::Rain, 0.65, false).titled("Rain"),
            TrackConfig::new(NoiseKind::Fireplace, 0.55, false).titled("Fireplace"),
        ]
    }
}

/// Load a JSON array of track definitions
pub fn load_tracks(path: &Path) -> Result<Vec<TrackConfig>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Make sure something will be heard: enable the first track if none is
///
/// Returns the id of the track that was switched on, if any.
pub fn ensure_audible(tracks: &mut [TrackConfig]) -> Option<TrackId> {
    if tracks.iter().any(|t| t.enabled) {
        return None;
    }
    let first = tracks.first_mut()?;
    first.enabled = true;
    Some(first.id)
}

// ============================================================================
// Unit Tests
// ============================================================================
