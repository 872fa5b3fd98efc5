//! # Pomodrift Core Library
//!
//! A work/break interval timer that stays correct across process suspension.
//! Remaining time is always reconstructed from the absolute instant the current
//! phase started, never from counted ticks, so a timer restored after a closed
//! laptop lid or a killed process lands in the right phase with the right
//! remaining time.
//!
//! ## Architecture
//!
//! - **Transition engine**: pure `(state, now) -> state` functions on
//!   [`TimerState`] (normalize, drift resync, tick, start, pause, reset,
//!   set mode, set progress)
//! - **Controller**: [`TimerController`] owns one timer and wires the engine to
//!   injected storage, scheduler and clock
//! - **Storage**: SQLite key-value persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerController`]: persisted, self-ticking timer
//! - [`TimerState`]: timer snapshot and transition functions
//! - [`Database`]: key-value persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod storage;
pub mod tasks;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use scheduler::{ManualScheduler, NoopScheduler, Scheduler, TokioScheduler};
pub use storage::{Config, Database, DatabaseStorage, MemoryStorage, NoopStorage, TimerStorage};
pub use tasks::{Task, TaskState};
pub use timer::{PartialTimerState, TimerController, TimerMode, TimerState};
