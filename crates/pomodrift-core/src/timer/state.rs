//! Timer state model.
//!
//! [`TimerState`] is the single record describing one timer: which phase it is
//! in, how long that phase is, how much of it is left and whether it is
//! counting down. [`PartialTimerState`] is the untrusted shape the same record
//! has when it comes back from storage.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

/// Length of the work phase when nothing else is configured (25 minutes).
pub const DEFAULT_WORK_DURATION: u32 = 1500;

/// Length of the break phase (5 minutes). Not configurable.
pub const BREAK_DURATION: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Work,
    Break,
}

impl TimerMode {
    /// The phase that follows this one in a cycle.
    pub fn next(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(TimerMode::Work),
            "break" => Ok(TimerMode::Break),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

/// Snapshot of one timer.
///
/// Durations are whole seconds. `start_time` marks when the countdown of the
/// current phase began and is only present while `running`; `remaining` is
/// always re-derived from it rather than decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    /// Length of the current phase.
    pub duration: u32,
    /// Seconds left in the current phase, `0..=duration`.
    pub remaining: u32,
    pub running: bool,
    pub start_time: Option<EpochMs>,
    /// Configured work phase length; survives break phases.
    pub work_duration: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            mode: TimerMode::Work,
            duration: DEFAULT_WORK_DURATION,
            remaining: DEFAULT_WORK_DURATION,
            running: false,
            start_time: None,
            work_duration: DEFAULT_WORK_DURATION,
        }
    }
}

impl TimerState {
    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        let left = f64::from(self.remaining.min(self.duration));
        1.0 - left / f64::from(self.duration)
    }

    /// 0.0 .. 1.0 position inside the whole work + break cycle.
    ///
    /// This is the quantity `set_progress` takes, so feeding it back yields
    /// the same phase position.
    pub fn cycle_progress(&self) -> f64 {
        let work = f64::from(self.work_duration);
        let total = work + f64::from(BREAK_DURATION);
        if total <= 0.0 {
            return 0.0;
        }
        let spent = f64::from(self.duration.saturating_sub(self.remaining));
        let elapsed = match self.mode {
            TimerMode::Work => spent,
            TimerMode::Break => work + spent,
        };
        (elapsed / total).clamp(0.0, 1.0)
    }

    /// Remaining time rendered as `MM:SS` (minutes are not wrapped at 60).
    pub fn remaining_display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

/// A possibly incomplete, possibly malformed persisted timer record.
///
/// Every field is optional and parsed on its own: a field with the wrong JSON
/// type reads as absent without discarding the rest of the record.
/// [`TimerState::normalize`] turns this into a consistent state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTimerState {
    #[serde(default, deserialize_with = "lenient")]
    pub mode: Option<TimerMode>,
    #[serde(default, deserialize_with = "lenient")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub remaining: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub running: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_time: Option<EpochMs>,
    #[serde(default, deserialize_with = "lenient")]
    pub work_duration: Option<u32>,
}

impl From<TimerState> for PartialTimerState {
    fn from(state: TimerState) -> Self {
        Self {
            mode: Some(state.mode),
            duration: Some(state.duration),
            remaining: Some(state.remaining),
            running: Some(state.running),
            start_time: state.start_time,
            work_duration: Some(state.work_duration),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
