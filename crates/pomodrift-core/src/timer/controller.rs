//! Timer controller.
//!
//! Owns one timer: its state cell, the handle of the periodic tick, and the
//! injected storage, scheduler and clock. Every operation runs the matching
//! engine transition under the state lock, persists the result, arms or
//! cancels the periodic tick to match `running`, and then tells subscribers.
//!
//! ## Usage
//!
//! ```
//! use pomodrift_core::clock::ManualClock;
//! use pomodrift_core::scheduler::ManualScheduler;
//! use pomodrift_core::storage::MemoryStorage;
//! use pomodrift_core::timer::TimerController;
//!
//! let clock = ManualClock::new(0);
//! let scheduler = ManualScheduler::new();
//! let timer = TimerController::builder()
//!     .storage(MemoryStorage::new())
//!     .scheduler(scheduler.clone())
//!     .clock(clock.clone())
//!     .build();
//!
//! timer.start();
//! clock.advance(1_000);
//! scheduler.fire();
//! assert_eq!(timer.state().remaining, 1499);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::state::{EpochMs, TimerMode, TimerState};
use crate::clock::{Clock, SystemClock};
use crate::events::{timestamp, Event};
use crate::scheduler::{NoopScheduler, Scheduler, TickCallback, TickHandle};
use crate::storage::{NoopStorage, TimerStorage};

/// Receives every event the controller emits.
///
/// Listeners run on whichever thread applied the transition (the scheduler's
/// thread for ticks), after every controller lock has been released. A
/// listener may call back into the controller; it only sees listeners that
/// were registered before the event was emitted.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Assembles a [`TimerController`]. Collaborators left unset fall back to
/// [`NoopStorage`], [`NoopScheduler`] and [`SystemClock`].
pub struct TimerControllerBuilder {
    storage: Option<Box<dyn TimerStorage>>,
    scheduler: Option<Box<dyn Scheduler>>,
    clock: Option<Box<dyn Clock>>,
    tick_interval: Duration,
}

impl Default for TimerControllerBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            scheduler: None,
            clock: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl TimerControllerBuilder {
    pub fn storage(mut self, storage: impl TimerStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Build the controller and restore the timer from storage.
    ///
    /// A snapshot that was running when saved comes back running, fast-forwarded
    /// to now, with the periodic tick armed.
    pub fn build(self) -> TimerController {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState::default()),
            ticker: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            storage: self.storage.unwrap_or_else(|| Box::new(NoopStorage)),
            scheduler: self.scheduler.unwrap_or_else(|| Box::new(NoopScheduler)),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            tick_interval: self.tick_interval,
        });
        let controller = TimerController { shared };
        controller.restore();
        controller
    }
}

/// One persisted, self-ticking timer.
///
/// Dropping the controller cancels its periodic tick; the persisted state is
/// left as it is, so a running timer resumes correctly on the next build.
pub struct TimerController {
    shared: Arc<Shared>,
}

impl TimerController {
    pub fn builder() -> TimerControllerBuilder {
        TimerControllerBuilder::default()
    }

    /// Current state as of the last transition.
    pub fn state(&self) -> TimerState {
        *self.shared.lock_state()
    }

    /// Whether a periodic tick is currently scheduled.
    pub fn is_ticking(&self) -> bool {
        self.shared.lock_ticker().is_some()
    }

    pub fn subscribe(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Reload from storage and fast-forward to now.
    ///
    /// Also the way to resynchronize after the host was suspended while the
    /// process stayed alive.
    pub fn restore(&self) -> TimerState {
        let shared = &self.shared;
        shared.commit(
            |_, now| Some(TimerState::normalize(shared.storage.load().as_ref(), now)),
            |_, state, at| Event::Restored { state, at },
        )
    }

    pub fn start(&self) -> TimerState {
        self.shared.commit(
            |state, now| Some(state.start(now)),
            |_, state, at| Event::Started { state, at },
        )
    }

    pub fn pause(&self) -> TimerState {
        self.shared.commit(
            |state, now| Some(state.pause(now)),
            |_, state, at| Event::Paused { state, at },
        )
    }

    pub fn reset(&self) -> TimerState {
        self.shared.commit(
            |state, _| Some(state.reset()),
            |_, state, at| Event::Reset { state, at },
        )
    }

    pub fn set_mode(&self, mode: TimerMode, duration: u32) -> TimerState {
        self.shared.commit(
            |state, _| Some(state.set_mode(mode, duration)),
            |_, state, at| Event::ModeChanged { state, at },
        )
    }

    pub fn set_progress(&self, progress: f64) -> TimerState {
        self.shared.commit(
            |state, now| Some(state.set_progress(progress, now)),
            |_, state, at| Event::ProgressChanged {
                progress,
                state,
                at,
            },
        )
    }

    /// Advance a running timer to now. What the periodic driver calls; a
    /// stopped timer is left untouched and nothing is persisted or emitted.
    pub fn tick(&self) -> TimerState {
        self.shared.tick()
    }

    /// Cancel the periodic tick without touching the state.
    pub fn shutdown(&self) {
        self.shared.disarm();
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Shared {
    state: Mutex<TimerState>,
    ticker: Mutex<Option<TickHandle>>,
    listeners: Mutex<Vec<Listener>>,
    storage: Box<dyn TimerStorage>,
    scheduler: Box<dyn Scheduler>,
    clock: Box<dyn Clock>,
    tick_interval: Duration,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<TickHandle>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(self: &Arc<Self>) -> TimerState {
        self.commit(
            |state, now| state.running.then(|| state.tick(now)),
            |previous, state, at| {
                if previous.mode == state.mode {
                    Event::Ticked { state, at }
                } else {
                    Event::PhaseCompleted {
                        completed: previous.mode,
                        state,
                        at,
                    }
                }
            },
        )
    }

    /// Apply one transition atomically with respect to every other transition.
    ///
    /// `transition` returning `None` means "nothing to do": the state is not
    /// stored, persisted or announced.
    fn commit(
        self: &Arc<Self>,
        transition: impl FnOnce(TimerState, EpochMs) -> Option<TimerState>,
        describe: impl FnOnce(TimerState, TimerState, DateTime<Utc>) -> Event,
    ) -> TimerState {
        let now = self.clock.now_ms();
        let event = {
            let mut cell = self.lock_state();
            let previous = *cell;
            let Some(next) = transition(previous, now) else {
                return previous;
            };
            *cell = next;

            if let Err(e) = self.storage.save(&next) {
                warn!(error = %e, "failed to persist timer state");
            }
            if next.running {
                self.arm();
            } else {
                self.disarm();
            }
            describe(previous, next, timestamp(now))
        };

        log_event(&event);
        self.notify(&event);
        *event.state()
    }

    fn arm(self: &Arc<Self>) {
        let mut ticker = self.lock_ticker();
        if ticker.is_some() {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let callback: TickCallback = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.tick();
            }
        });
        *ticker = Some(self.scheduler.schedule(callback, self.tick_interval));
    }

    fn disarm(&self) {
        if let Some(handle) = self.lock_ticker().take() {
            self.scheduler.cancel(handle);
        }
    }

    fn notify(&self, event: &Event) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(event);
        }
    }
}

fn log_event(event: &Event) {
    let state = event.state();
    match event {
        Event::Restored { .. } => info!(
            mode = %state.mode,
            remaining = state.remaining,
            running = state.running,
            "timer restored"
        ),
        Event::Ticked { .. } => {}
        Event::PhaseCompleted { completed, .. } => info!(
            completed = %completed,
            next = %state.mode,
            duration = state.duration,
            "phase completed"
        ),
        _ => debug!(
            mode = %state.mode,
            remaining = state.remaining,
            running = state.running,
            "timer transition"
        ),
    }
}
