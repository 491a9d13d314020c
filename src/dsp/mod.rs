//! Synthesis and mixing
//!
//! Per-sample noise generators, the `tanh` soft clip applied to the mix bus,
//! and the render-stage mixer that ties them to the shared track registry.

pub mod mixer;
pub mod noise;
pub mod saturation;

pub use mixer::Mixer;
pub use noise::{NoiseKind, RandomSource};
pub use saturation::{soft_clip, soft_clip_scaled};
