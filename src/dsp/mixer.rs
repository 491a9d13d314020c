//! Render stage: mixes enabled tracks into interleaved output blocks
//!
//! A `Mixer` is owned by whatever drives the audio clock (a device callback or
//! an offline tap). Per block it takes one snapshot of the registry, renders
//! every frame from local copies, then writes filter memory back once.
//! Nothing here locks, logs or (after warm-up) allocates. A table swapped out
//! mid-block is released by the registry on the control side, not here.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dsp::noise::NoiseKind;
use crate::dsp::saturation::soft_clip_scaled;
use crate::engine::registry::TrackRegistry;

/// Initial voice capacity; grows only if a configuration has more tracks
const VOICE_CAPACITY: usize = 16;

/// Render-local copy of one enabled track
#[derive(Debug, Clone, Copy)]
struct Voice {
    slot: usize,
    kind: NoiseKind,
    volume: f32,
    filter: f32,
}

/// Mixes the registry's enabled tracks into audio blocks
#[derive(Debug)]
pub struct Mixer {
    registry: Arc<TrackRegistry>,
    rng: ChaCha8Rng,
    voices: Vec<Voice>,
}

impl Mixer {
    /// Create a mixer reading `registry`, with noise drawn from `seed`
    pub fn new(registry: Arc<TrackRegistry>, seed: u64) -> Self {
        Self {
            registry,
            rng: ChaCha8Rng::seed_from_u64(seed),
            voices: Vec::with_capacity(VOICE_CAPACITY),
        }
    }

    /// Render one interleaved block into `out`
    ///
    /// Every channel of a frame receives the same mono sample. Trailing
    /// samples that do not form a whole frame are zeroed.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            out.fill(0.0);
            return;
        }

        // One snapshot per block
        let table = self.registry.current();
        let master = self.registry.master_volume();

        self.voices.clear();
        for (slot, track) in table.slots().iter().enumerate() {
            if track.is_enabled() {
                self.voices.push(Voice {
                    slot,
                    kind: track.kind(),
                    volume: track.volume(),
                    filter: track.filter_value(),
                });
            }
        }

        let mut frames = out.chunks_exact_mut(channels);
        for frame in &mut frames {
            let mut mixed = 0.0f32;
            for voice in self.voices.iter_mut() {
                mixed += voice.kind.next_sample(&mut voice.filter, &mut self.rng) * voice.volume;
            }
            frame.fill(soft_clip_scaled(mixed, master));
        }
        frames.into_remainder().fill(0.0);

        // Disabled tracks were never copied, so their memory stays frozen
        let slots = table.slots();
        for voice in &self.voices {
            slots[voice.slot].store_filter(voice.filter);
        }
    }

    /// Render `frames` frames into a fresh buffer
    pub fn render_block(&mut self, frames: usize, channels: usize) -> Vec<f32> {
        let mut block = vec![0.0; frames * channels];
        self.render(&mut block, channels);
        block
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
