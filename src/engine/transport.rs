//! Playback State Machine
//!
//! Tracks the engine lifecycle (Idle -> Playing -> FadingOut -> Idle) and the
//! interruption protocol: when the platform takes the output away, remember
//! whether we were playing so playback can be resumed once, if allowed.
//!
//! This type holds no audio resources; the engine performs the side effects
//! that go with each transition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::status::EngineStatus;

/// Lifecycle states of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Output inactive (default state)
    #[default]
    Idle,
    /// Output active at full master volume
    Playing,
    /// Output active while the master volume ramps to zero
    FadingOut,
}

impl PlaybackState {
    /// Whether audio output is running in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::FadingOut => write!(f, "FadingOut"),
        }
    }
}

// ============================================================================
// Platform Signals
// ============================================================================

/// Why the platform changed the output route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteChangeReason {
    /// A new device appeared (e.g. headphones plugged in)
    NewDeviceAvailable,
    /// The device we were using went away (e.g. headphones unplugged)
    OldDeviceUnavailable,
    /// No route can carry the output any more
    NoSuitableRoute,
    CategoryChange,
    Override,
    Unknown,
}

impl RouteChangeReason {
    /// Whether this change takes the current output away
    pub fn is_disruptive(&self) -> bool {
        matches!(
            self,
            RouteChangeReason::OldDeviceUnavailable | RouteChangeReason::NoSuitableRoute
        )
    }
}

/// Best-effort platform signals about the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    /// Another client took the output (call, alarm, ...)
    Began,
    /// The interruption is over; the platform says whether resuming is allowed
    Ended { should_resume: bool },
    /// The output route changed
    RouteChanged(RouteChangeReason),
}

// ============================================================================
// Transport
// ============================================================================

/// Engine lifecycle plus interruption bookkeeping
#[derive(Debug, Clone, Default)]
pub struct Transport {
    /// Current lifecycle state
    state: PlaybackState,

    /// An interruption is in progress
    interrupted: bool,

    /// Playback was running when the interruption began
    resume_pending: bool,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Idle -> Playing
    ///
    /// Returns `false` (and changes nothing) when output is already active.
    pub fn play(&mut self) -> bool {
        match self.state {
            PlaybackState::Idle => {
                self.state = PlaybackState::Playing;
                true
            }
            PlaybackState::Playing | PlaybackState::FadingOut => false,
        }
    }

    /// Playing -> FadingOut
    ///
    /// Returns `false` when idle or already fading.
    pub fn begin_fade(&mut self) -> bool {
        match self.state {
            PlaybackState::Playing => {
                self.state = PlaybackState::FadingOut;
                true
            }
            PlaybackState::Idle | PlaybackState::FadingOut => false,
        }
    }

    /// Any -> Idle; returns whether the state changed
    pub fn stop(&mut self) -> bool {
        let was_active = self.state.is_active();
        self.state = PlaybackState::Idle;
        was_active
    }

    // ========================================================================
    // Interruption Protocol
    // ========================================================================

    /// The output was taken away
    ///
    /// Remembers whether playback was active, fading or not. Repeated
    /// signals during one interruption keep the first decision.
    ///
    /// Returns whether output is currently active and must be stopped.
    pub fn on_interruption_began(&mut self) -> bool {
        if !self.interrupted {
            self.interrupted = true;
            self.resume_pending = self.state.is_active();
        }
        self.state.is_active()
    }

    /// The interruption ended
    ///
    /// Returns `true` exactly once per interruption, when playback was running
    /// before it and the platform allows resuming.
    pub fn on_interruption_ended(&mut self, should_resume: bool) -> bool {
        if !self.interrupted {
            return false;
        }
        let resume = self.resume_pending && should_resume;
        self.clear_interruption();
        resume
    }

    /// Forget any pending interruption (the user took control)
    pub fn clear_interruption(&mut self) {
        self.interrupted = false;
        self.resume_pending = false;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn resume_pending(&self) -> bool {
        self.resume_pending
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_fading_out(&self) -> bool {
        self.state == PlaybackState::FadingOut
    }

    /// Observer-facing view of the state
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            is_playing: self.state.is_active(),
            is_fading_out: self.is_fading_out(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
