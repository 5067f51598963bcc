// Tracing setup
//
// Console output on stderr, plus an optional plain-text log file.
// `REFRAIN_LOG` takes EnvFilter directives (e.g. `refrain=debug,reqwest=warn`);
// otherwise the configured level applies to this crate.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::{Mutex, Once};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_ENV_VAR: &str = "REFRAIN_LOG";

static INIT: Once = Once::new();

/// Default directive for a configured level. Unknown levels fall back to info.
pub fn default_directive(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    format!("refrain={}", level)
}

fn make_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let file = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(file)
        }
        None => None,
    };

    INIT.call_once(|| {
        let file_layer = file.map(|f| {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(f))
        });

        let _ = tracing_subscriber::registry()
            .with(make_filter(config))
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(file_layer)
            .try_init();
    });

    Ok(())
}
