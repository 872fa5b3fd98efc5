//! Persistence boundary for the timer.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::timer::{PartialTimerState, TimerState};

/// Where the controller keeps the timer between runs.
///
/// `load` hands back whatever was stored, unvalidated; the controller
/// normalizes it. A backend that cannot read its data should log and return
/// `None` rather than fail.
pub trait TimerStorage: Send + Sync {
    fn load(&self) -> Option<PartialTimerState>;

    /// # Errors
    /// Returns an error if the backend cannot write the snapshot.
    fn save(&self, state: &TimerState) -> Result<()>;
}

/// Storage used when no backend is configured: nothing is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl TimerStorage for NoopStorage {
    fn load(&self) -> Option<PartialTimerState> {
        None
    }

    fn save(&self, _state: &TimerState) -> Result<()> {
        Ok(())
    }
}

/// In-process storage. Clones share the stored snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    snapshot: Arc<Mutex<Option<PartialTimerState>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot with arbitrary (possibly invalid) data.
    pub fn set_raw(&self, snapshot: Option<PartialTimerState>) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn clear(&self) {
        self.set_raw(None);
    }
}

impl TimerStorage for MemoryStorage {
    fn load(&self) -> Option<PartialTimerState> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        self.set_raw(Some((*state).into()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_clones_share_snapshot() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        assert!(storage.load().is_none());

        let state = TimerState::default();
        other.save(&state).unwrap();
        assert_eq!(storage.load(), Some(PartialTimerState::from(state)));

        storage.clear();
        assert!(other.load().is_none());
    }

    #[test]
    fn noop_storage_keeps_nothing() {
        NoopStorage.save(&TimerState::default()).unwrap();
        assert!(NoopStorage.load().is_none());
    }
}
