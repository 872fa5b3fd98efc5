mod controller;
mod engine;
mod state;

pub use controller::{Listener, TimerController, TimerControllerBuilder, DEFAULT_TICK_INTERVAL};
pub use state::{
    EpochMs, PartialTimerState, TimerMode, TimerState, BREAK_DURATION, DEFAULT_WORK_DURATION,
};
