use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{EpochMs, TimerMode, TimerState};

/// Every controller transition produces an Event.
/// Subscribers receive them after the new state has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// State loaded from storage and fast-forwarded to the present.
    Restored {
        state: TimerState,
        at: DateTime<Utc>,
    },
    Started {
        state: TimerState,
        at: DateTime<Utc>,
    },
    Paused {
        state: TimerState,
        at: DateTime<Utc>,
    },
    Reset {
        state: TimerState,
        at: DateTime<Utc>,
    },
    ModeChanged {
        state: TimerState,
        at: DateTime<Utc>,
    },
    ProgressChanged {
        progress: f64,
        state: TimerState,
        at: DateTime<Utc>,
    },
    /// Periodic update within the same phase.
    Ticked {
        state: TimerState,
        at: DateTime<Utc>,
    },
    /// A tick ended the `completed` phase; `state` is the next phase.
    PhaseCompleted {
        completed: TimerMode,
        state: TimerState,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The timer state after the transition.
    pub fn state(&self) -> &TimerState {
        match self {
            Event::Restored { state, .. }
            | Event::Started { state, .. }
            | Event::Paused { state, .. }
            | Event::Reset { state, .. }
            | Event::ModeChanged { state, .. }
            | Event::ProgressChanged { state, .. }
            | Event::Ticked { state, .. }
            | Event::PhaseCompleted { state, .. } => state,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::Restored { at, .. }
            | Event::Started { at, .. }
            | Event::Paused { at, .. }
            | Event::Reset { at, .. }
            | Event::ModeChanged { at, .. }
            | Event::ProgressChanged { at, .. }
            | Event::Ticked { at, .. }
            | Event::PhaseCompleted { at, .. } => *at,
        }
    }
}

/// Convert an epoch-millisecond reading to a UTC timestamp.
///
/// Readings outside chrono's range collapse to the epoch.
pub fn timestamp(now: EpochMs) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::PhaseCompleted {
            completed: TimerMode::Work,
            state: TimerState::default(),
            at: timestamp(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_completed");
        assert_eq!(json["completed"], "work");
        assert_eq!(json["state"]["workDuration"], 1500);
        assert_eq!(json["at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn accessors_cover_every_variant() {
        let at = timestamp(1_767_225_600_000);
        let event = Event::Paused {
            state: TimerState::default(),
            at,
        };
        assert_eq!(event.state(), &TimerState::default());
        assert_eq!(event.at(), at);
    }

    #[test]
    fn out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(timestamp(i64::MAX), DateTime::<Utc>::default());
    }
}
