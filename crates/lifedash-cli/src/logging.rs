//! Logging setup
//!
//! Off unless `LIFEDASH_LOG` is set (e.g. `LIFEDASH_LOG=debug`). Logs go to
//! `log_file` when configured, otherwise to stderr.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use lifedash_core::Config;

pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var("LIFEDASH_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "lifedash_core={},lifedash_cli={}",
        log_level, log_level
    ));

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
            info!("Logging to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
