//! Timer transition engine.
//!
//! Every transition is a pure function `(state, now) -> state` on
//! [`TimerState`]. Nothing here reads a clock or touches storage; the caller
//! passes the current wall-clock reading in and persists what comes out.
//!
//! Remaining time is never decremented. While running it is recomputed from
//! `start_time` and `now`, so ticks that are late, missed, or separated by
//! days of process suspension cannot accumulate error.
//!
//! ## Phase cycle
//!
//! ```text
//! Work(work_duration) -> Break(BREAK_DURATION) -> Work(work_duration) -> ...
//! ```
//!
//! ## Usage
//!
//! ```
//! use pomodrift_core::timer::{TimerMode, TimerState};
//!
//! let state = TimerState::normalize(None, 0).start(0);
//! let state = state.tick(5_000);
//! assert_eq!(state.mode, TimerMode::Work);
//! assert_eq!(state.remaining, 1495);
//! ```

use super::state::{
    EpochMs, PartialTimerState, TimerMode, TimerState, BREAK_DURATION, DEFAULT_WORK_DURATION,
};

impl TimerState {
    /// Rebuild a consistent state from an untrusted snapshot.
    ///
    /// Each field is validated on its own and replaced by its default when
    /// missing or out of range. A running snapshot is fast-forwarded to `now`
    /// with [`TimerState::derive_running_state`], however stale it is.
    #[must_use]
    pub fn normalize(input: Option<&PartialTimerState>, now: EpochMs) -> Self {
        let input = input.cloned().unwrap_or_default();
        let mode = input.mode.unwrap_or(TimerMode::Work);
        let positive = |value: Option<u32>| value.filter(|secs| *secs > 0);

        let work_duration = positive(input.work_duration).unwrap_or(match mode {
            TimerMode::Break => DEFAULT_WORK_DURATION,
            TimerMode::Work => positive(input.duration).unwrap_or(DEFAULT_WORK_DURATION),
        });
        let duration = positive(input.duration).unwrap_or(match mode {
            TimerMode::Break => BREAK_DURATION,
            TimerMode::Work => work_duration,
        });
        let remaining = input
            .remaining
            .filter(|secs| *secs <= duration)
            .unwrap_or(duration);
        let running = input.running.unwrap_or(false);

        let mut state = Self {
            mode,
            duration,
            remaining,
            running,
            start_time: None,
            work_duration,
        };
        if running {
            // A start instant ahead of the clock cannot be trusted.
            let start_time = input.start_time.filter(|start| *start <= now);
            state.start_time = Some(start_time.unwrap_or_else(|| state.implied_start(now)));
            state = state.derive_running_state(now);
        }
        state
    }

    /// Fast-forward a running state through any number of elapsed phases.
    ///
    /// Uses modulo arithmetic over the work + break cycle anchored at
    /// `start_time`, so three seconds and three hundred days cost the same.
    #[must_use]
    pub fn derive_running_state(self, now: EpochMs) -> Self {
        let Some(start_time) = self.start_time else {
            return self;
        };
        let elapsed = elapsed_secs(start_time, now);
        if elapsed <= 0 {
            return self;
        }

        let work = i64::from(self.work_duration);
        let brk = i64::from(BREAK_DURATION);
        // How far into the cycle the phase anchored at start_time already was.
        let offset = match self.mode {
            TimerMode::Break => work,
            TimerMode::Work => 0,
        };
        let cycle_elapsed = (elapsed + offset).rem_euclid(work + brk);

        if cycle_elapsed < work {
            Self {
                mode: TimerMode::Work,
                duration: self.work_duration,
                remaining: secs(work - cycle_elapsed),
                running: true,
                start_time: Some(now - cycle_elapsed * 1000),
                ..self
            }
        } else {
            let break_elapsed = cycle_elapsed - work;
            Self {
                mode: TimerMode::Break,
                duration: BREAK_DURATION,
                remaining: secs(brk - break_elapsed),
                running: true,
                start_time: Some(now - break_elapsed * 1000),
                ..self
            }
        }
    }

    /// Advance a running timer to `now`.
    ///
    /// The phase flips as soon as the recomputed remaining time drops to one
    /// second, one tick early, so a once-per-second driver never shows `00:00`
    /// for a whole interval.
    #[must_use]
    pub fn tick(self, now: EpochMs) -> Self {
        if !self.running {
            return self;
        }
        let start_time = self.start_time.unwrap_or_else(|| self.implied_start(now));
        let remaining = self.remaining_at(start_time, now);
        if remaining > 1 {
            return Self {
                remaining,
                start_time: Some(start_time),
                ..self
            };
        }
        self.next_phase(now)
    }

    #[must_use]
    pub fn start(self, now: EpochMs) -> Self {
        let start_time = self.start_time.unwrap_or_else(|| self.implied_start(now));
        Self {
            running: true,
            start_time: Some(start_time),
            ..self
        }
    }

    #[must_use]
    pub fn pause(self, now: EpochMs) -> Self {
        let remaining = match self.start_time {
            Some(start_time) => self.remaining_at(start_time, now),
            None => self.remaining,
        };
        Self {
            remaining,
            running: false,
            start_time: None,
            ..self
        }
    }

    /// Back to a stopped, full-length work phase, whatever the current mode.
    #[must_use]
    pub fn reset(self) -> Self {
        Self {
            mode: TimerMode::Work,
            duration: self.work_duration,
            remaining: self.work_duration,
            running: false,
            start_time: None,
            ..self
        }
    }

    /// Switch to `mode` with a fresh phase of `duration` seconds, stopped.
    ///
    /// Choosing `Work` also makes `duration` the new work length; a break
    /// leaves the work length alone. Zero is raised to one second.
    #[must_use]
    pub fn set_mode(self, mode: TimerMode, duration: u32) -> Self {
        let duration = duration.max(1);
        let work_duration = match mode {
            TimerMode::Work => duration,
            TimerMode::Break => self.work_duration,
        };
        Self {
            mode,
            duration,
            remaining: duration,
            running: false,
            start_time: None,
            work_duration,
        }
    }

    /// Scrub to a fraction of the whole work + break cycle.
    ///
    /// `progress` is clamped to `0.0..=1.0` (NaN counts as 0). A running timer
    /// keeps running from the new position.
    #[must_use]
    pub fn set_progress(self, progress: f64, now: EpochMs) -> Self {
        let clamped = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let work = f64::from(self.work_duration);
        let elapsed = clamped * (work + f64::from(BREAK_DURATION));

        let (mode, duration, remaining) = if elapsed <= work {
            (TimerMode::Work, self.work_duration, work - elapsed)
        } else {
            (
                TimerMode::Break,
                BREAK_DURATION,
                f64::from(BREAK_DURATION) - (elapsed - work),
            )
        };
        let remaining = (remaining.round() as i64).clamp(0, i64::from(duration));

        let mut state = Self {
            mode,
            duration,
            remaining: secs(remaining),
            start_time: None,
            ..self
        };
        if state.running {
            state.start_time = Some(state.implied_start(now));
        }
        state
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// The start instant that makes `remaining` correct at `now`.
    fn implied_start(&self, now: EpochMs) -> EpochMs {
        let spent = i64::from(self.duration.saturating_sub(self.remaining));
        now - spent * 1000
    }

    fn remaining_at(&self, start_time: EpochMs, now: EpochMs) -> u32 {
        let left = i64::from(self.duration) - elapsed_secs(start_time, now);
        secs(left.clamp(0, i64::from(self.duration)))
    }

    fn next_phase(self, now: EpochMs) -> Self {
        let mode = self.mode.next();
        let duration = match mode {
            TimerMode::Work => self.work_duration,
            TimerMode::Break => BREAK_DURATION,
        };
        Self {
            mode,
            duration,
            remaining: duration,
            running: true,
            start_time: Some(now),
            ..self
        }
    }
}

/// Whole seconds from `start` to `now`, rounded toward negative infinity.
fn elapsed_secs(start: EpochMs, now: EpochMs) -> i64 {
    now.saturating_sub(start).div_euclid(1000)
}

/// Narrow a value already bounded by a `u32` duration.
fn secs(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
