//! Fade-out plan
//!
//! A fade is a fixed number of discrete master-volume steps spread evenly
//! over the requested duration. Step `k` of `n` sets the master volume to
//! `max(0, 1 - k/n)`; the last step reaches silence and ends playback.

use std::time::Duration;

use crate::config::DEFAULT_FADE_STEPS;
use crate::error::{Result, SoundscapeError};

/// Evenly spaced master-volume ramp to silence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePlan {
    steps: u32,
    duration: Duration,
    step_interval: Duration,
}

impl Default for FadePlan {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60), DEFAULT_FADE_STEPS)
    }
}

impl FadePlan {
    /// Plan `steps` steps across `duration` (at least one step)
    pub fn new(duration: Duration, steps: u32) -> Self {
        let steps = steps.max(1);
        Self {
            steps,
            duration,
            step_interval: duration / steps,
        }
    }

    /// Plan from a duration in seconds, rejecting negative, non-finite or
    /// overflowing input
    pub fn from_secs_f64(secs: f64, steps: u32) -> Result<Self> {
        let duration = Duration::try_from_secs_f64(secs).map_err(|e| {
            SoundscapeError::InvalidParameter {
                name: "fade_duration",
                reason: format!("{} seconds is not a usable duration: {}", secs, e),
            }
        })?;
        Ok(Self::new(duration, steps))
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Master volume after `step` steps
    pub fn level_at(&self, step: u32) -> f32 {
        (1.0 - step as f32 / self.steps as f32).max(0.0)
    }

    /// Whether `step` is the step that ends playback
    pub fn is_final(&self, step: u32) -> bool {
        step >= self.steps
    }

    /// Levels of steps `1..=steps`
    pub fn levels(&self) -> impl Iterator<Item = f32> + '_ {
        (1..=self.steps).map(move |step| self.level_at(step))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_interval() {
        let plan = FadePlan::new(Duration::from_secs(1), 40);
        assert_eq!(plan.step_interval(), Duration::from_millis(25));
        assert_eq!(plan.steps(), 40);
    }

    #[test]
    fn test_levels_non_increasing_to_zero() {
        let plan = FadePlan::new(Duration::from_secs(10), 40);
        let levels: Vec<f32> = plan.levels().collect();

        assert_eq!(levels.len(), 40);
        assert_relative_eq!(levels[0], 0.975);
        assert!(levels.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*levels.last().unwrap(), 0.0);
        assert!(plan.is_final(40));
        assert!(!plan.is_final(39));
    }

    #[test]
    fn test_level_never_negative() {
        let plan = FadePlan::new(Duration::from_secs(1), 4);
        assert_eq!(plan.level_at(0), 1.0);
        assert_eq!(plan.level_at(10), 0.0);
    }

    #[test]
    fn test_zero_steps_promoted_to_one() {
        let plan = FadePlan::new(Duration::from_secs(2), 0);
        assert_eq!(plan.steps(), 1);
        assert_eq!(plan.step_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_seconds_rejected() {
        assert!(FadePlan::from_secs_f64(-1.0, 40).is_err());
        assert!(FadePlan::from_secs_f64(f64::NAN, 40).is_err());
        assert!(FadePlan::from_secs_f64(f64::INFINITY, 40).is_err());

        let plan = FadePlan::from_secs_f64(0.0, 40).unwrap();
        assert_eq!(plan.step_interval(), Duration::ZERO);
    }

    #[test]
    fn test_overflowing_seconds_rejected() {
        let err = FadePlan::from_secs_f64(1e30, 40).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(FadePlan::from_secs_f64(f64::MAX, 40).is_err());

        // A day is fine
        assert!(FadePlan::from_secs_f64(86_400.0, 40).is_ok());
    }
}
