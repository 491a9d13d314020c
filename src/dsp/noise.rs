//! Procedural noise generators
//!
//! Each noise kind is a one-pole low-pass over a uniform white source in
//! [-1, 1]. The only state a generator carries is the filter memory, which the
//! caller owns so it can live in the shared track registry.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Pink noise smoothing (heavy: energy sits in the low end)
const PINK_POLE: f32 = 0.98;

/// Rain smoothing (lighter, leaves room for the shimmer term)
const RAIN_POLE: f32 = 0.92;

/// Weight of the raw white sample added on top of the rain filter
const RAIN_SHIMMER: f32 = 0.1;

/// Fireplace smoothing (very heavy: low rumble)
const FIREPLACE_POLE: f32 = 0.995;

/// Per-sample probability of a fireplace crackle
const CRACKLE_PROBABILITY: f64 = 0.02;

/// Crackle magnitude range
const CRACKLE_MIN: f32 = 0.3;
const CRACKLE_MAX: f32 = 0.8;

// ============================================================================
// Random Source
// ============================================================================

/// Source of the random values a generator consumes
///
/// The engine uses a seeded ChaCha stream; tests replay scripted values.
pub trait RandomSource {
    /// Uniform value in `[lo, hi]`
    fn uniform(&mut self, lo: f32, hi: f32) -> f32;

    /// `true` with probability `p`
    fn chance(&mut self, p: f64) -> bool;

    /// Uniform white sample in [-1, 1]
    #[inline]
    fn white(&mut self) -> f32 {
        self.uniform(-1.0, 1.0)
    }
}

impl RandomSource for ChaCha8Rng {
    #[inline]
    fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        self.random_range(lo..=hi)
    }

    #[inline]
    fn chance(&mut self, p: f64) -> bool {
        self.random_bool(p.clamp(0.0, 1.0))
    }
}

// ============================================================================
// Noise Kind
// ============================================================================

/// The closed set of synthesizable noise colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoiseKind {
    /// Heavily smoothed noise, steady masking bed
    PinkNoise,
    /// Lightly smoothed noise plus raw shimmer
    Rain,
    /// Deep rumble with sparse impulsive crackle
    Fireplace,
}

impl NoiseKind {
    /// Every kind, in display order
    pub fn all() -> [NoiseKind; 3] {
        [NoiseKind::PinkNoise, NoiseKind::Rain, NoiseKind::Fireplace]
    }

    /// Get display name for the noise kind
    pub fn display_name(&self) -> &'static str {
        match self {
            NoiseKind::PinkNoise => "Pink Noise",
            NoiseKind::Rain => "Rain",
            NoiseKind::Fireplace => "Fireplace",
        }
    }

    /// Get string identifier (matches the serialized form)
    pub fn to_str(&self) -> &'static str {
        match self {
            NoiseKind::PinkNoise => "pinkNoise",
            NoiseKind::Rain => "rain",
            NoiseKind::Fireplace => "fireplace",
        }
    }

    /// Pole of the one-pole low-pass for this kind
    pub fn pole(&self) -> f32 {
        match self {
            NoiseKind::PinkNoise => PINK_POLE,
            NoiseKind::Rain => RAIN_POLE,
            NoiseKind::Fireplace => FIREPLACE_POLE,
        }
    }

    /// Largest magnitude `next_sample` can return from a filter state in [-1, 1]
    pub fn peak_bound(&self) -> f32 {
        match self {
            NoiseKind::PinkNoise | NoiseKind::Rain => 1.0,
            NoiseKind::Fireplace => 1.0 + CRACKLE_MAX,
        }
    }

    /// Pure filter step: `(filter, white, crackle) -> (sample, new_filter)`
    ///
    /// `crackle` is only read by [`NoiseKind::Fireplace`].
    #[inline]
    pub fn step(self, filter: f32, white: f32, crackle: f32) -> (f32, f32) {
        let pole = self.pole();
        let next = pole * filter + (1.0 - pole) * white;
        let sample = match self {
            NoiseKind::PinkNoise => next,
            NoiseKind::Rain => (1.0 - RAIN_SHIMMER) * next + RAIN_SHIMMER * white,
            NoiseKind::Fireplace => next + crackle,
        };
        (sample, next)
    }

    /// Produce one sample and advance `filter`
    #[inline]
    pub fn next_sample<R: RandomSource + ?Sized>(self, filter: &mut f32, rng: &mut R) -> f32 {
        let white = rng.white();
        let crackle = match self {
            NoiseKind::Fireplace => crackle(rng),
            _ => 0.0,
        };
        let (sample, next) = self.step(*filter, white, crackle);
        *filter = next;
        sample
    }
}

/// Sparse crackle impulse: mostly zero, occasionally a signed burst
#[inline]
fn crackle<R: RandomSource + ?Sized>(rng: &mut R) -> f32 {
    if rng.chance(CRACKLE_PROBABILITY) {
        rng.uniform(CRACKLE_MIN, CRACKLE_MAX) * rng.white()
    } else {
        0.0
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for NoiseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pink" | "pinknoise" | "pink-noise" | "pink_noise" => Ok(NoiseKind::PinkNoise),
            "rain" => Ok(NoiseKind::Rain),
            "fire" | "fireplace" => Ok(NoiseKind::Fireplace),
            other => Err(format!(
                "unknown noise kind '{}' (expected pinkNoise, rain or fireplace)",
                other
            )),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use test_case::test_case;

    /// Replays scripted values; falls back to 0 / `false` once exhausted
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        values: VecDeque<f32>,
        chances: VecDeque<bool>,
    }

    impl ScriptedSource {
        pub(crate) fn new(values: &[f32], chances: &[bool]) -> Self {
            Self {
                values: values.iter().copied().collect(),
                chances: chances.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for ScriptedSource {
        fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
            self.values.pop_front().unwrap_or(0.0).clamp(lo, hi)
        }

        fn chance(&mut self, _p: f64) -> bool {
            self.chances.pop_front().unwrap_or(false)
        }
    }

    #[test]
    fn test_pink_recipe() {
        let mut rng = ScriptedSource::new(&[1.0, -1.0], &[]);
        let mut filter = 0.0;

        let first = NoiseKind::PinkNoise.next_sample(&mut filter, &mut rng);
        assert_relative_eq!(first, 0.02);
        assert_relative_eq!(filter, 0.02);

        let second = NoiseKind::PinkNoise.next_sample(&mut filter, &mut rng);
        assert_relative_eq!(second, 0.98 * 0.02 - 0.02, epsilon = 1e-7);
    }

    #[test]
    fn test_rain_recipe_adds_shimmer() {
        let mut rng = ScriptedSource::new(&[0.5], &[]);
        let mut filter = 0.25;

        let sample = NoiseKind::Rain.next_sample(&mut filter, &mut rng);
        let expected_filter = 0.92 * 0.25 + 0.08 * 0.5;
        assert_relative_eq!(filter, expected_filter, epsilon = 1e-7);
        assert_relative_eq!(sample, 0.9 * expected_filter + 0.1 * 0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_fireplace_crackle_uses_fresh_draw() {
        // white, crackle magnitude, crackle sign/magnitude
        let mut rng = ScriptedSource::new(&[0.2, 0.5, -1.0], &[true]);
        let mut filter = 0.0;

        let sample = NoiseKind::Fireplace.next_sample(&mut filter, &mut rng);
        assert_relative_eq!(filter, 0.005 * 0.2, epsilon = 1e-7);
        assert_relative_eq!(sample, 0.001 - 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_fireplace_without_crackle() {
        let mut rng = ScriptedSource::new(&[1.0], &[false]);
        let mut filter = 0.4;

        let sample = NoiseKind::Fireplace.next_sample(&mut filter, &mut rng);
        assert_relative_eq!(sample, 0.995 * 0.4 + 0.005, epsilon = 1e-7);
        assert_relative_eq!(sample, filter);
    }

    #[test]
    fn test_seeded_stream_is_replayable() {
        for kind in NoiseKind::all() {
            let mut a = ChaCha8Rng::seed_from_u64(7);
            let mut b = ChaCha8Rng::seed_from_u64(7);
            let (mut fa, mut fb) = (0.0, 0.0);
            for _ in 0..1000 {
                let sa = kind.next_sample(&mut fa, &mut a);
                let sb = kind.next_sample(&mut fb, &mut b);
                assert_eq!(sa.to_bits(), sb.to_bits());
            }
            assert_eq!(fa.to_bits(), fb.to_bits());
        }
    }

    #[test]
    fn test_outputs_stay_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for kind in NoiseKind::all() {
            let mut filter = 0.0;
            for _ in 0..200_000 {
                let sample = kind.next_sample(&mut filter, &mut rng);
                assert!(filter.abs() <= 1.0, "{} filter escaped: {}", kind, filter);
                assert!(
                    sample.abs() <= kind.peak_bound() + 1e-6,
                    "{} sample escaped: {}",
                    kind,
                    sample
                );
            }
        }
    }

    // f32 rounding allowance on the bounds
    const BOUND_EPSILON: f32 = 1e-6;

    proptest! {
        #[test]
        fn prop_step_keeps_filter_in_unit_range(
            index in 0usize..3,
            filter in -1.0f32..=1.0,
            white in -1.0f32..=1.0,
            crackle in -CRACKLE_MAX..=CRACKLE_MAX,
        ) {
            let kind = NoiseKind::all()[index];
            let (_, next) = kind.step(filter, white, crackle);
            prop_assert!(next.abs() <= 1.0 + BOUND_EPSILON, "{} filter escaped: {}", kind, next);
        }

        #[test]
        fn prop_step_sample_within_peak_bound(
            index in 0usize..3,
            filter in -1.0f32..=1.0,
            white in -1.0f32..=1.0,
            crackle in -CRACKLE_MAX..=CRACKLE_MAX,
        ) {
            let kind = NoiseKind::all()[index];
            let (sample, _) = kind.step(filter, white, crackle);
            prop_assert!(
                sample.abs() <= kind.peak_bound() + BOUND_EPSILON,
                "{} sample escaped: {}",
                kind,
                sample
            );
        }

        #[test]
        fn prop_filter_stays_bounded_over_runs(
            index in 0usize..3,
            whites in prop::collection::vec(-1.0f32..=1.0, 1..256),
        ) {
            let kind = NoiseKind::all()[index];
            let mut filter = 0.0f32;
            for white in whites {
                let (_, next) = kind.step(filter, white, 0.0);
                filter = next;
                prop_assert!(filter.abs() <= 1.0 + BOUND_EPSILON);
            }
        }
    }

    #[test]
    fn test_pink_is_smoother_than_rain() {
        // Mean absolute first difference tracks high-frequency energy
        fn roughness(kind: NoiseKind) -> f32 {
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let mut filter = 0.0;
            let mut prev = 0.0;
            let mut total = 0.0;
            for _ in 0..50_000 {
                let s = kind.next_sample(&mut filter, &mut rng);
                total += (s - prev).abs();
                prev = s;
            }
            total / 50_000.0
        }
        assert!(roughness(NoiseKind::PinkNoise) < roughness(NoiseKind::Rain));
    }

    #[test_case("pink", NoiseKind::PinkNoise; "short pink")]
    #[test_case("pinkNoise", NoiseKind::PinkNoise; "serialized pink")]
    #[test_case("pink-noise", NoiseKind::PinkNoise; "kebab pink")]
    #[test_case("rain", NoiseKind::Rain; "rain")]
    #[test_case("Fire", NoiseKind::Fireplace; "short fire")]
    #[test_case("fireplace", NoiseKind::Fireplace; "fireplace")]
    fn test_kind_parsing(input: &str, expected: NoiseKind) {
        assert_eq!(input.parse::<NoiseKind>().unwrap(), expected);
    }

    #[test]
    fn test_kind_serde() {
        assert!("ocean".parse::<NoiseKind>().is_err());

        let json = serde_json::to_string(&NoiseKind::PinkNoise).unwrap();
        assert_eq!(json, "\"pinkNoise\"");
        let kind: NoiseKind = serde_json::from_str("\"fireplace\"").unwrap();
        assert_eq!(kind, NoiseKind::Fireplace);
    }
}
