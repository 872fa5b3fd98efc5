use std::sync::{Arc, Mutex, PoisonError};

use clap::Subcommand;
use pomodrift_core::storage::{Database, DatabaseStorage};
use pomodrift_core::timer::BREAK_DURATION;
use pomodrift_core::{Config, Event, TimerController, TimerMode, TimerState, TokioScheduler};
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and return to a full work phase
    Reset,
    /// Bring a running timer up to date and persist it
    Tick,
    /// Switch phase and set its length (stops the timer)
    Mode {
        /// Phase to switch to: work or break
        mode: TimerMode,
        /// Phase length in seconds (defaults: configured work length, or the break length)
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Jump to a position in the work + break cycle
    Progress {
        /// Fraction of the cycle, 0.0 to 1.0
        #[arg(allow_negative_numbers = true)]
        fraction: f64,
    },
    /// Drive the timer in the foreground, printing one JSON event per line
    Run {
        /// Pause the timer when interrupted instead of leaving it running
        #[arg(long)]
        pause_on_exit: bool,
    },
}

fn open_timer(config: &Config) -> Result<TimerController, Box<dyn std::error::Error>> {
    Ok(TimerController::builder()
        .storage(DatabaseStorage::new(Database::open()?))
        .tick_interval(config.tick_interval())
        .build())
}

fn status_json(state: &TimerState) -> serde_json::Value {
    serde_json::json!({
        "state": state,
        "display": state.remaining_display(),
        "phaseProgress": state.phase_progress(),
        "cycleProgress": state.cycle_progress(),
    })
}

pub fn run(action: TimerAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run { pause_on_exit } => run_foreground(config, pause_on_exit),
        action => run_once(action, config),
    }
}

/// Apply one operation to the persisted timer and print what happened.
fn run_once(action: TimerAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let timer = open_timer(config)?;
    let events: Arc<Mutex<Vec<Event>>> = Arc::default();
    let sink = Arc::clone(&events);
    timer.subscribe(move |event| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    });

    let state = match action {
        TimerAction::Status => timer.state(),
        TimerAction::Start => timer.start(),
        TimerAction::Pause => timer.pause(),
        TimerAction::Reset => timer.reset(),
        TimerAction::Tick => timer.tick(),
        TimerAction::Mode { mode, duration } => {
            let duration = duration.unwrap_or(match mode {
                TimerMode::Work => config.timer.work_duration_secs,
                TimerMode::Break => BREAK_DURATION,
            });
            timer.set_mode(mode, duration)
        }
        TimerAction::Progress { fraction } => timer.set_progress(fraction),
        TimerAction::Run { .. } => timer.state(),
    };

    let events = std::mem::take(&mut *events.lock().unwrap_or_else(PoisonError::into_inner));
    if events.is_empty() {
        println!("{}", serde_json::to_string_pretty(&status_json(&state))?);
    }
    for event in &events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}

fn run_foreground(config: &Config, pause_on_exit: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let timer = TimerController::builder()
            .storage(DatabaseStorage::new(Database::open()?))
            .scheduler(TokioScheduler::new(tokio::runtime::Handle::current()))
            .tick_interval(config.tick_interval())
            .build();
        timer.subscribe(|event| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to encode event"),
        });

        let state = timer.start();
        info!(
            mode = %state.mode,
            remaining = %state.remaining_display(),
            "timer running, press Ctrl-C to stop"
        );

        tokio::signal::ctrl_c().await?;
        if pause_on_exit {
            timer.pause();
        }
        timer.shutdown();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
