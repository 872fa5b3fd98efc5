//! Periodic callback scheduling.
//!
//! The controller uses a [`Scheduler`] to call `tick` once per interval while
//! the timer runs and cancels it whenever the timer stops. Three
//! implementations ship with the crate:
//!
//! - [`TokioScheduler`]: one tokio task per schedule, driven by `tokio::time::interval`
//! - [`ManualScheduler`]: fires only when asked, for deterministic tests
//! - [`NoopScheduler`]: never fires; the timer still works when polled

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

pub trait Scheduler: Send + Sync {
    /// Run `callback` every `interval` until cancelled. The first call happens
    /// one interval from now.
    fn schedule(&self, callback: TickCallback, interval: Duration) -> TickHandle;

    /// Stop a scheduled callback. Unknown or already cancelled handles are ignored.
    fn cancel(&self, handle: TickHandle);
}

/// Scheduler used when no periodic driver is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl Scheduler for NoopScheduler {
    fn schedule(&self, _callback: TickCallback, _interval: Duration) -> TickHandle {
        TickHandle(0)
    }

    fn cancel(&self, _handle: TickHandle) {}
}

/// Drives callbacks from tasks spawned on a tokio runtime.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Scheduler on the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of callbacks that have not been cancelled.
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, callback: TickCallback, interval: Duration) -> TickHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let period = interval.max(Duration::from_millis(1));
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                callback();
            }
        });
        debug!(id, interval_ms = period.as_millis() as u64, "scheduled periodic tick");
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task);
        TickHandle(id)
    }

    fn cancel(&self, handle: TickHandle) {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        if let Some(task) = task {
            task.abort();
            debug!(id = handle.0, "cancelled periodic tick");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Default)]
struct ManualEntries {
    next_id: u64,
    entries: BTreeMap<TickHandle, (TickCallback, Duration)>,
}

/// Scheduler that fires only when [`ManualScheduler::fire`] is called.
///
/// Clones share their schedule, so tests keep one handle and give the other
/// to the controller.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualEntries>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every active callback once. Returns how many ran.
    pub fn fire(&self) -> usize {
        let callbacks: Vec<TickCallback> = self
            .lock()
            .entries
            .values()
            .map(|(callback, _)| Arc::clone(callback))
            .collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    pub fn active(&self) -> usize {
        self.lock().entries.len()
    }

    /// Interval of the most recently scheduled active callback.
    pub fn interval(&self) -> Option<Duration> {
        self.lock()
            .entries
            .values()
            .next_back()
            .map(|(_, interval)| *interval)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualEntries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, callback: TickCallback, interval: Duration) -> TickHandle {
        let mut inner = self.lock();
        inner.next_id += 1;
        let handle = TickHandle(inner.next_id);
        inner.entries.insert(handle, (callback, interval));
        handle
    }

    fn cancel(&self, handle: TickHandle) {
        self.lock().entries.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, TickCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        let callback: TickCallback = Arc::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn manual_scheduler_fires_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let (count, callback) = counter();
        let handle = scheduler.schedule(callback, Duration::from_secs(1));
        assert_eq!(scheduler.active(), 1);
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(1)));

        assert_eq!(scheduler.fire(), 1);
        assert_eq!(scheduler.fire(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.cancel(handle);
        assert_eq!(scheduler.fire(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        scheduler.cancel(handle);
    }

    #[test]
    fn noop_scheduler_never_fires() {
        let (count, callback) = counter();
        let handle = NoopScheduler.schedule(callback, Duration::from_secs(1));
        NoopScheduler.cancel(handle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_every_interval() {
        let scheduler = TokioScheduler::current().expect("inside a runtime");
        let (count, callback) = counter();
        let handle = scheduler.schedule(callback, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.cancel(handle);
        assert_eq!(scheduler.active(), 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn tokio_scheduler_requires_runtime() {
        assert!(TokioScheduler::current().is_none());
    }
}
