mod config;
pub mod database;
mod timer_store;

pub use config::{Config, LogConfig, TimerConfig};
pub use database::{Database, DatabaseStorage};
pub use timer_store::{MemoryStorage, NoopStorage, TimerStorage};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `POMODRIFT_DATA_DIR` wins when set. Otherwise this is
/// `~/.config/pomodrift/`, or `~/.config/pomodrift-dev/` with `POMODRIFT_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("POMODRIFT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMODRIFT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomodrift-dev")
            } else {
                base_dir.join("pomodrift")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
