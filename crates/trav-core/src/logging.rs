//! Tracing subscriber bootstrap
//!
//! Library code only emits events. Binaries and tests call
//! [`init_tracing`] once to see them. `RUST_LOG` overrides the default
//! filter, which is `debug` in debug builds and `info` otherwise.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Install the global subscriber with text output
pub fn init_tracing() {
    init_tracing_with(LogFormat::Text);
}

/// Install the global subscriber
///
/// Only the first call in a process has an effect. A subscriber installed
/// elsewhere beforehand is left in place.
pub fn init_tracing_with(format: LogFormat) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                EnvFilter::new("debug")
            } else {
                EnvFilter::new("info")
            }
        });
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true);
        match format {
            LogFormat::Text => builder.try_init().ok(),
            LogFormat::Json => builder.json().try_init().ok(),
        };
    });
}
