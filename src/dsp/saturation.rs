//! Soft clipping for the summed mix
//!
//! The mix bus can exceed unity when several tracks are enabled at high
//! volume. A `tanh` waveshaper keeps the output strictly inside (-1, 1)
//! while staying transparent near zero.

/// Soft clip: `tanh(x)`
///
/// Strictly monotonic, odd, and `|soft_clip(x)| < 1` for finite `x`
/// (at f32 precision large inputs saturate to exactly ±1.0).
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Soft clip then apply the post-clip gain, mapping non-finite input to silence
#[inline]
pub fn soft_clip_scaled(x: f32, gain: f32) -> f32 {
    let shaped = soft_clip(x) * gain;
    if shaped.is_finite() {
        shaped
    } else {
        0.0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
