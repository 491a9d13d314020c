//! Observable engine status
//!
//! Observers subscribe to a single event channel. Events are sent
//! synchronously with the transition that caused them, so every subscriber
//! sees transitions in the order they happened.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Published playback flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_playing: bool,
    pub is_fading_out: bool,
}

impl EngineStatus {
    /// One-line hint for a status bar
    pub fn summary(&self, has_enabled_track: bool) -> &'static str {
        if self.is_fading_out {
            "Fading out..."
        } else if self.is_playing {
            "A 20-40 minute fade-out helps avoid waking during the night."
        } else if has_enabled_track {
            "Pick the soundscapes you like, then press start."
        } else {
            "Enable at least one soundscape before starting."
        }
    }
}

/// Everything an observer can be told
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// The playback flags changed
    StatusChanged(EngineStatus),
    /// `start()` could not activate the output; the engine stays idle
    StartFailed { reason: String },
    /// The platform took the output away and playback was stopped
    Interrupted,
    /// Playback restarted after an interruption
    Resumed,
}

/// Fan-out of engine events to subscribers
#[derive(Debug, Default)]
pub struct StatusBus {
    current: EngineStatus,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New subscriber; its first event is the current status
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        let _ = tx.send(EngineEvent::StatusChanged(self.current));
        self.subscribers.push(tx);
        rx
    }

    /// Record `status`, notifying only when it differs from the last one
    pub fn publish(&mut self, status: EngineStatus) {
        if status != self.current {
            self.current = status;
            self.emit(EngineEvent::StatusChanged(status));
        }
    }

    /// Send an event to every live subscriber, dropping the dead ones
    pub fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn current(&self) -> EngineStatus {
        self.current
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drop every subscriber
    pub fn close(&mut self) {
        self.subscribers.clear();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAYING: EngineStatus = EngineStatus {
        is_playing: true,
        is_fading_out: false,
    };

    #[test]
    fn test_subscriber_gets_current_status_first() {
        let mut bus = StatusBus::new();
        bus.publish(PLAYING);

        let rx = bus.subscribe();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::StatusChanged(PLAYING));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_only_on_change() {
        let mut bus = StatusBus::new();
        let rx = bus.subscribe();
        rx.try_recv().unwrap();

        bus.publish(EngineStatus::default());
        assert!(rx.try_recv().is_err());

        bus.publish(PLAYING);
        bus.publish(PLAYING);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_events_arrive_in_order() {
        let mut bus = StatusBus::new();
        let rx = bus.subscribe();

        bus.publish(PLAYING);
        bus.emit(EngineEvent::Interrupted);
        bus.publish(EngineStatus::default());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                EngineEvent::StatusChanged(EngineStatus::default()),
                EngineEvent::StatusChanged(PLAYING),
                EngineEvent::Interrupted,
                EngineEvent::StatusChanged(EngineStatus::default()),
            ]
        );
    }

    #[test]
    fn test_dropped_subscribers_pruned() {
        let mut bus = StatusBus::new();
        let rx = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PLAYING);
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);

        bus.close();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_summary_text() {
        assert_eq!(EngineStatus::default().summary(false), "Enable at least one soundscape before starting.");
        let fading = EngineStatus {
            is_playing: true,
            is_fading_out: true,
        };
        assert_eq!(fading.summary(true), "Fading out...");
    }
}
