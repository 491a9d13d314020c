//! Audio output abstraction
//!
//! An output owns the render stage while active and pulls blocks from it at
//! its own cadence. Activation is the only fallible step of starting the
//! engine.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dsp::Mixer;
use crate::error::{Result, SoundscapeError};

/// Something that can drive a [`Mixer`] at audio rate
pub trait AudioOutput: Send {
    /// Take ownership of `mixer` and begin pulling blocks from it
    ///
    /// Replaces any mixer from a previous activation.
    fn activate(&mut self, mixer: Mixer) -> Result<()>;

    /// Stop pulling blocks and release the mixer
    fn deactivate(&mut self);

    fn is_active(&self) -> bool;

    /// Short human-readable description for logs
    fn describe(&self) -> String {
        "audio output".to_string()
    }
}

// ============================================================================
// Offline Output
// ============================================================================

#[derive(Debug)]
struct OfflineSlot {
    mixer: Option<Mixer>,
    available: bool,
    channels: usize,
}

/// In-process output whose blocks are pulled through a [`RenderTap`]
///
/// Used for tests, WAV rendering and hosts that own their own audio clock.
#[derive(Debug)]
pub struct OfflineOutput {
    slot: Arc<Mutex<OfflineSlot>>,
}

/// Pull side of an [`OfflineOutput`]
///
/// Clones share the same output. While inactive every block is silence.
#[derive(Debug, Clone)]
pub struct RenderTap {
    slot: Arc<Mutex<OfflineSlot>>,
}

impl OfflineOutput {
    /// New output with `channels` interleaved channels and its tap
    pub fn new(channels: u16) -> (Self, RenderTap) {
        let slot = Arc::new(Mutex::new(OfflineSlot {
            mixer: None,
            available: true,
            channels: channels as usize,
        }));
        (
            OfflineOutput { slot: slot.clone() },
            RenderTap { slot },
        )
    }
}

impl AudioOutput for OfflineOutput {
    fn activate(&mut self, mixer: Mixer) -> Result<()> {
        let mut slot = self.slot.lock();
        if !slot.available {
            return Err(SoundscapeError::output_unavailable(
                "offline output refused activation",
            ));
        }
        slot.mixer = Some(mixer);
        Ok(())
    }

    fn deactivate(&mut self) {
        self.slot.lock().mixer = None;
    }

    fn is_active(&self) -> bool {
        self.slot.lock().mixer.is_some()
    }

    fn describe(&self) -> String {
        format!("offline output ({} ch)", self.slot.lock().channels)
    }
}

impl RenderTap {
    /// Render `frames` interleaved frames
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let channels = self.channels();
        let mut block = vec![0.0; frames * channels];
        self.render_into(&mut block);
        block
    }

    /// Render into an existing interleaved buffer
    pub fn render_into(&self, out: &mut [f32]) {
        let mut slot = self.slot.lock();
        let channels = slot.channels;
        match slot.mixer.as_mut() {
            Some(mixer) => mixer.render(out, channels),
            None => out.fill(0.0),
        }
    }

    pub fn channels(&self) -> usize {
        self.slot.lock().channels
    }

    pub fn is_active(&self) -> bool {
        self.slot.lock().mixer.is_some()
    }

    /// Simulate a platform that grants or denies the output
    pub fn set_available(&self, available: bool) {
        self.slot.lock().available = available;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
