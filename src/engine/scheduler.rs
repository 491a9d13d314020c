//! Cancellable periodic tasks
//!
//! Fade steps run on a timer independent of the audio clock. A scheduler runs
//! one task's ticks strictly in order and checks the task's handle before
//! every tick, so a cancelled task never runs again.
//!
//! [`ThreadScheduler`] uses a real clock; [`ManualScheduler`] advances a
//! simulated one on the caller's thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// What a task wants after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    /// Run again after another interval
    Continue,
    /// Never run again
    Finish,
}

/// Body of a repeating task
pub type RepeatingTask = Box<dyn FnMut() -> TaskControl + Send + 'static>;

/// Runs tasks at a fixed interval
pub trait Scheduler: Send + Sync {
    /// Run `task` every `interval` (first run after one interval) until it
    /// finishes or its handle is cancelled
    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TaskHandle;
}

// ============================================================================
// Task Handle
// ============================================================================

#[derive(Debug)]
struct TaskState {
    cancelled: AtomicBool,
    wake: Option<Sender<()>>,
}

/// Handle to a scheduled task
///
/// Dropping the handle does not cancel the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    state: Arc<TaskState>,
}

impl TaskHandle {
    fn new(wake: Option<Sender<()>>) -> Self {
        Self {
            state: Arc::new(TaskState {
                cancelled: AtomicBool::new(false),
                wake,
            }),
        }
    }

    /// Cancel the task; idempotent
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            if let Some(wake) = &self.state.wake {
                let _ = wake.try_send(());
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }
}

// ============================================================================
// Thread Scheduler
// ============================================================================

/// Real-time scheduler: one timer thread per task
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        ThreadScheduler
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule_repeating(&self, interval: Duration, mut task: RepeatingTask) -> TaskHandle {
        let (wake_tx, wake_rx) = bounded(1);
        let handle = TaskHandle::new(Some(wake_tx));
        let worker_handle = handle.clone();

        let spawned = thread::Builder::new()
            .name("soundscape-timer".to_string())
            .spawn(move || {
                // Deadlines are absolute so ticks do not drift; a deadline
                // past what `Instant` can hold waits for cancellation only
                let mut deadline = Instant::now().checked_add(interval);
                loop {
                    let woke = match deadline {
                        Some(at) => wake_rx.recv_deadline(at),
                        None => wake_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match woke {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if worker_handle.is_cancelled() || task() == TaskControl::Finish {
                        break;
                    }
                    deadline = deadline.and_then(|at| at.checked_add(interval));
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not spawn timer thread: {}", e);
            handle.cancel();
        }
        handle
    }
}

// ============================================================================
// Manual Scheduler
// ============================================================================

struct ManualTask {
    interval: Duration,
    next_due: Duration,
    handle: TaskHandle,
    task: RepeatingTask,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    tasks: Vec<ManualTask>,
}

/// Simulated-clock scheduler
///
/// Time only moves when [`ManualScheduler::advance`] is called; due ticks run
/// on the caller's thread in deadline order.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time elapsed so far
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of tasks still scheduled
    pub fn pending(&self) -> usize {
        let mut clock = self.clock.lock();
        clock.tasks.retain(|t| !t.handle.is_cancelled());
        clock.tasks.len()
    }

    /// Move the clock forward by `by`, running every tick that falls due
    ///
    /// Returns the number of ticks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.lock().now.saturating_add(by);
        let mut ran = 0;

        loop {
            // Take the earliest due task out so it runs without the clock lock
            let mut next = {
                let mut clock = self.clock.lock();
                clock.tasks.retain(|t| !t.handle.is_cancelled());
                let due = clock
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.next_due <= target)
                    .min_by_key(|(_, t)| t.next_due)
                    .map(|(i, _)| i);
                match due {
                    Some(i) => {
                        let task = clock.tasks.remove(i);
                        clock.now = clock.now.max(task.next_due);
                        task
                    }
                    None => {
                        clock.now = target;
                        return ran;
                    }
                }
            };

            if next.handle.is_cancelled() {
                continue;
            }
            let control = (next.task)();
            ran += 1;

            if control == TaskControl::Continue && !next.handle.is_cancelled() {
                // Zero-interval tasks keep ticking until they finish
                next.next_due = next.next_due.saturating_add(next.interval);
                self.clock.lock().tasks.push(next);
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new(None);
        let mut clock = self.clock.lock();
        let next_due = clock.now.saturating_add(interval);
        clock.tasks.push(ManualTask {
            interval,
            next_due,
            handle: handle.clone(),
            task,
        });
        handle
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
