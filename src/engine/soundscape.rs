//! Soundscape engine: the public control surface
//!
//! Owns the track registry, the audio output, the fade timer and the status
//! bus. Control calls come from one logical caller (a UI thread) plus the fade
//! timer; both go through a short-held control lock. The render stage never
//! takes that lock: it only reads the lock-free registry.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, TrackConfig};
use crate::dsp::Mixer;
use crate::engine::fade::FadePlan;
use crate::engine::output::{AudioOutput, OfflineOutput, RenderTap};
use crate::engine::registry::{MixSnapshot, TrackId, TrackRegistry, TrackState};
use crate::engine::scheduler::{Scheduler, TaskControl, TaskHandle};
use crate::engine::status::{EngineEvent, EngineStatus, StatusBus};
use crate::engine::transport::{Interruption, PlaybackState, Transport};
use crate::error::Result;

/// A fade that is currently scheduled
struct ActiveFade {
    generation: u64,
    step: u32,
    plan: FadePlan,
    handle: TaskHandle,
}

/// State only the control side touches
struct ControlState {
    transport: Transport,
    output: Box<dyn AudioOutput>,
    fade: Option<ActiveFade>,
    fade_generation: u64,
    bus: StatusBus,
}

struct EngineInner {
    config: EngineConfig,
    registry: Arc<TrackRegistry>,
    scheduler: Arc<dyn Scheduler>,
    control: Mutex<ControlState>,
}

/// Procedural ambient soundscape engine
///
/// Owned by the application context and lent by reference to whatever needs
/// to drive or observe it. Dropping the engine stops playback, cancels any
/// fade and disconnects observers.
pub struct SoundscapeEngine {
    inner: Arc<EngineInner>,
}

impl SoundscapeEngine {
    /// Create an idle engine with no tracks
    pub fn new(
        config: EngineConfig,
        output: Box<dyn AudioOutput>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Soundscape engine ready ({} Hz, {} ch, {})",
            config.sample_rate,
            config.channels,
            output.describe()
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                registry: Arc::new(TrackRegistry::new()),
                scheduler,
                control: Mutex::new(ControlState {
                    transport: Transport::new(),
                    output,
                    fade: None,
                    fade_generation: 0,
                    bus: StatusBus::new(),
                }),
            }),
        })
    }

    /// Engine driven by an in-process [`RenderTap`] instead of a device
    pub fn offline(config: EngineConfig, scheduler: Arc<dyn Scheduler>) -> Result<(Self, RenderTap)> {
        let (output, tap) = OfflineOutput::new(config.channels);
        let engine = Self::new(config, Box::new(output), scheduler)?;
        Ok((engine, tap))
    }

    /// Engine on the default output device with a real-time fade clock
    #[cfg(feature = "cpal")]
    pub fn with_default_device(config: EngineConfig) -> Result<Self> {
        use crate::engine::cpal_output::CpalOutput;
        use crate::engine::scheduler::ThreadScheduler;

        let output = CpalOutput::new()?;
        Self::new(config, Box::new(output), Arc::new(ThreadScheduler::new()))
    }

    // ========================================================================
    // Track Control
    // ========================================================================

    /// Replace every track; filter memory starts from zero
    ///
    /// While playing, the render stage picks up the new table at its next
    /// block.
    pub fn configure_tracks(&self, tracks: &[TrackConfig]) {
        let count = self.inner.registry.configure(tracks);
        debug!("Configured {} track(s)", count);
    }

    /// Set a track's volume (clamped to [0, 1]); unknown ids are ignored
    pub fn set_volume(&self, id: TrackId, volume: f32) {
        if !self.inner.registry.set_volume(id, volume) {
            debug!("Ignoring volume for unknown track {}", id);
        }
    }

    /// Enable or disable a track without touching its filter memory
    pub fn set_enabled(&self, id: TrackId, enabled: bool) {
        if !self.inner.registry.set_enabled(id, enabled) {
            debug!("Ignoring enable for unknown track {}", id);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start playback at full master volume; no-op if already playing
    ///
    /// On failure the engine stays idle, observers receive
    /// [`EngineEvent::StartFailed`], and the error is returned.
    pub fn start(&self) -> Result<()> {
        let mut ctl = self.inner.control.lock();
        ctl.transport.clear_interruption();
        self.inner.start_locked(&mut ctl)
    }

    /// Stop playback and cancel any fade; idempotent
    pub fn stop(&self) {
        let mut ctl = self.inner.control.lock();
        ctl.transport.clear_interruption();
        self.inner.stop_locked(&mut ctl);
    }

    /// Start if idle, stop otherwise
    pub fn toggle_playback(&self) -> Result<()> {
        if self.status().is_playing {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Ramp the master volume to zero over `duration`, then stop
    ///
    /// Returns `false` without doing anything when not playing or when a fade
    /// is already running.
    pub fn fade_out(&self, duration: Duration) -> bool {
        let plan = FadePlan::new(duration, self.inner.config.fade_steps);
        self.inner.begin_fade(&Arc::downgrade(&self.inner), plan)
    }

    /// [`fade_out`](Self::fade_out) taking seconds
    pub fn fade_out_secs(&self, secs: f64) -> Result<bool> {
        let plan = FadePlan::from_secs_f64(secs, self.inner.config.fade_steps)?;
        Ok(self.inner.begin_fade(&Arc::downgrade(&self.inner), plan))
    }

    /// React to a platform interruption or route change
    pub fn handle_interruption(&self, event: Interruption) {
        let mut ctl = self.inner.control.lock();
        match event {
            Interruption::Began => self.inner.interrupt_locked(&mut ctl),
            Interruption::RouteChanged(reason) if reason.is_disruptive() => {
                self.inner.interrupt_locked(&mut ctl)
            }
            Interruption::RouteChanged(reason) => {
                debug!("Ignoring non-disruptive route change: {:?}", reason);
            }
            Interruption::Ended { should_resume } => {
                if !ctl.transport.on_interruption_ended(should_resume) {
                    debug!("Interruption ended, staying idle");
                    return;
                }
                match self.inner.start_locked(&mut ctl) {
                    Ok(()) => {
                        info!("Resumed playback after interruption");
                        ctl.bus.emit(EngineEvent::Resumed);
                    }
                    Err(e) => warn!("Could not resume after interruption: {}", e),
                }
            }
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn status(&self) -> EngineStatus {
        self.inner.control.lock().transport.status()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.control.lock().transport.state()
    }

    /// Subscribe to status changes and lifecycle events
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.inner.control.lock().bus.subscribe()
    }

    pub fn master_volume(&self) -> f32 {
        self.inner.registry.master_volume()
    }

    pub fn track(&self, id: TrackId) -> Option<TrackState> {
        self.inner.registry.track(id)
    }

    pub fn snapshot(&self) -> MixSnapshot {
        self.inner.registry.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The shared registry, for hosts that build their own render stage
    pub fn registry(&self) -> &Arc<TrackRegistry> {
        &self.inner.registry
    }
}

impl Drop for SoundscapeEngine {
    fn drop(&mut self) {
        let mut ctl = self.inner.control.lock();
        self.inner.stop_locked(&mut ctl);
        ctl.bus.close();
    }
}

impl EngineInner {
    fn mixer_seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(rand::random)
    }

    fn start_locked(&self, ctl: &mut ControlState) -> Result<()> {
        if ctl.transport.is_active() {
            debug!("Start ignored: already {}", ctl.transport.state());
            return Ok(());
        }

        // Full volume before the first block is pulled
        self.registry.set_master_volume(1.0);
        let mixer = Mixer::new(self.registry.clone(), self.mixer_seed());

        if let Err(e) = ctl.output.activate(mixer) {
            warn!("Failed to start output: {}", e);
            ctl.bus.emit(EngineEvent::StartFailed {
                reason: e.to_string(),
            });
            return Err(e);
        }

        ctl.transport.play();
        ctl.bus.publish(ctl.transport.status());
        info!("Playback started with {} track(s)", self.registry.len());
        Ok(())
    }

    fn stop_locked(&self, ctl: &mut ControlState) {
        if let Some(fade) = ctl.fade.take() {
            fade.handle.cancel();
            debug!("Cancelled fade at step {}/{}", fade.step, fade.plan.steps());
        }
        ctl.output.deactivate();
        if ctl.transport.stop() {
            info!("Playback stopped");
        }
        ctl.bus.publish(ctl.transport.status());
    }

    fn interrupt_locked(&self, ctl: &mut ControlState) {
        if ctl.transport.on_interruption_began() {
            self.stop_locked(ctl);
            info!(
                "Output interrupted (resume pending: {})",
                ctl.transport.resume_pending()
            );
            ctl.bus.emit(EngineEvent::Interrupted);
        }
    }

    fn begin_fade(&self, this: &Weak<EngineInner>, plan: FadePlan) -> bool {
        let mut guard = self.control.lock();
        let ctl = &mut *guard;
        if ctl.fade.is_some() || !ctl.transport.begin_fade() {
            debug!("Fade ignored while {}", ctl.transport.state());
            return false;
        }

        ctl.fade_generation += 1;
        let generation = ctl.fade_generation;
        let weak = this.clone();
        let handle = self.scheduler.schedule_repeating(
            plan.step_interval(),
            Box::new(move || match weak.upgrade() {
                Some(inner) => inner.fade_step(generation),
                None => TaskControl::Finish,
            }),
        );

        ctl.fade = Some(ActiveFade {
            generation,
            step: 0,
            plan,
            handle,
        });
        ctl.bus.publish(ctl.transport.status());
        info!(
            "Fading out over {:.1}s in {} steps",
            plan.duration().as_secs_f64(),
            plan.steps()
        );
        true
    }

    /// One tick of the fade timer
    fn fade_step(&self, generation: u64) -> TaskControl {
        let mut ctl = self.control.lock();
        let (level, finished) = match ctl.fade.as_mut() {
            Some(fade) if fade.generation == generation => {
                fade.step += 1;
                (fade.plan.level_at(fade.step), fade.plan.is_final(fade.step))
            }
            // Stale tick from a cancelled or replaced fade
            _ => return TaskControl::Finish,
        };

        self.registry.set_master_volume(level);
        if finished {
            ctl.fade = None;
            self.stop_locked(&mut ctl);
            info!("Fade-out complete");
            TaskControl::Finish
        } else {
            TaskControl::Continue
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::NoiseKind;
    use crate::engine::scheduler::ManualScheduler;
    use crate::engine::transport::RouteChangeReason;

    fn offline_engine() -> (SoundscapeEngine, RenderTap, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let (engine, tap) =
            SoundscapeEngine::offline(EngineConfig::default().with_seed(1), scheduler.clone()).unwrap();
        (engine, tap, scheduler)
    }

    fn pink(volume: f32, enabled: bool) -> TrackConfig {
        TrackConfig::new(NoiseKind::PinkNoise, volume, enabled)
    }

    #[test]
    fn test_start_and_stop() {
        let (engine, tap, _) = offline_engine();
        engine.configure_tracks(&[pink(0.7, true)]);

        engine.start().unwrap();
        assert!(engine.status().is_playing);
        assert!(tap.is_active());

        engine.stop();
        assert_eq!(engine.status(), EngineStatus::default());
        assert!(!tap.is_active());
    }

    #[test]
    fn test_start_twice_is_no_op() {
        let (engine, _tap, _) = offline_engine();
        engine.start().unwrap();
        let rx = engine.subscribe();
        rx.try_recv().unwrap();

        engine.start().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_start_reported() {
        let (engine, tap, _) = offline_engine();
        let rx = engine.subscribe();
        rx.try_recv().unwrap();
        tap.set_available(false);

        let err = engine.start().unwrap_err();
        assert_eq!(err.error_code(), "OUTPUT_UNAVAILABLE");
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(matches!(rx.try_recv().unwrap(), EngineEvent::StartFailed { .. }));

        tap.set_available(true);
        engine.start().unwrap();
        assert!(engine.status().is_playing);
    }

    #[test]
    fn test_start_restores_master_volume() {
        let (engine, _tap, scheduler) = offline_engine();
        engine.start().unwrap();
        engine.fade_out(Duration::from_secs(4));
        scheduler.advance(Duration::from_secs(2));
        assert!(engine.master_volume() < 1.0);

        engine.stop();
        engine.start().unwrap();
        assert_eq!(engine.master_volume(), 1.0);
    }

    #[test]
    fn test_fade_ignored_when_idle() {
        let (engine, _tap, scheduler) = offline_engine();
        assert!(!engine.fade_out(Duration::from_secs(1)));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_stop_cancels_fade() {
        let (engine, _tap, scheduler) = offline_engine();
        engine.start().unwrap();
        engine.fade_out(Duration::from_secs(1));
        scheduler.advance(Duration::from_millis(100));
        let level = engine.master_volume();

        engine.stop();
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(engine.master_volume(), level);
    }

    #[test]
    fn test_stale_fade_step_is_no_op() {
        let (engine, _tap, _) = offline_engine();
        engine.start().unwrap();
        engine.fade_out(Duration::from_secs(1));
        engine.stop();
        engine.start().unwrap();

        // Tick belonging to the first fade arrives late
        assert_eq!(engine.inner.fade_step(1), TaskControl::Finish);
        assert_eq!(engine.master_volume(), 1.0);
        assert!(engine.status().is_playing);
    }

    #[test]
    fn test_unknown_track_controls_ignored() {
        let (engine, _tap, _) = offline_engine();
        engine.configure_tracks(&[pink(0.5, true)]);
        let before = engine.snapshot();

        engine.set_volume(TrackId::new(), 0.1);
        engine.set_enabled(TrackId::new(), false);
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_interruption_resumes_when_allowed() {
        let (engine, tap, _) = offline_engine();
        engine.start().unwrap();
        let rx = engine.subscribe();
        rx.try_recv().unwrap();

        engine.handle_interruption(Interruption::Began);
        assert!(!engine.status().is_playing);
        assert!(!tap.is_active());

        engine.handle_interruption(Interruption::Ended { should_resume: true });
        assert!(engine.status().is_playing);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&EngineEvent::Interrupted));
        assert_eq!(events.last(), Some(&EngineEvent::Resumed));
    }

    #[test]
    fn test_interruption_without_permission_stays_idle() {
        let (engine, _tap, _) = offline_engine();
        engine.start().unwrap();

        engine.handle_interruption(Interruption::RouteChanged(RouteChangeReason::OldDeviceUnavailable));
        engine.handle_interruption(Interruption::Ended { should_resume: false });
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_failed_resume_stays_idle() {
        let (engine, tap, _) = offline_engine();
        engine.start().unwrap();
        engine.handle_interruption(Interruption::Began);

        tap.set_available(false);
        engine.handle_interruption(Interruption::Ended { should_resume: true });
        assert_eq!(engine.state(), PlaybackState::Idle);

        // Only one recovery attempt per interruption
        tap.set_available(true);
        engine.handle_interruption(Interruption::Ended { should_resume: true });
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_explicit_stop_cancels_pending_resume() {
        let (engine, _tap, _) = offline_engine();
        engine.start().unwrap();
        engine.handle_interruption(Interruption::Began);
        engine.stop();

        engine.handle_interruption(Interruption::Ended { should_resume: true });
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_non_disruptive_route_change_ignored() {
        let (engine, _tap, _) = offline_engine();
        engine.start().unwrap();
        engine.handle_interruption(Interruption::RouteChanged(RouteChangeReason::NewDeviceAvailable));
        assert!(engine.status().is_playing);
    }

    #[test]
    fn test_toggle_playback() {
        let (engine, _tap, _) = offline_engine();
        engine.toggle_playback().unwrap();
        assert!(engine.status().is_playing);
        engine.toggle_playback().unwrap();
        assert!(!engine.status().is_playing);
    }

    #[test]
    fn test_drop_disconnects_observers() {
        let (engine, _tap, scheduler) = offline_engine();
        let rx = engine.subscribe();
        engine.start().unwrap();
        engine.fade_out(Duration::from_secs(1));

        drop(engine);
        assert_eq!(scheduler.pending(), 0);
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events.last(),
            Some(&EngineEvent::StatusChanged(EngineStatus::default()))
        );
    }
}
