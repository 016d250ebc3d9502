//! Tracing subscriber setup for the `stager` binary.

use clap::ValueEnum;
use std::io::IsTerminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber. Log lines go to stderr so `run --json`
/// keeps stdout clean.
///
/// `level` takes an `EnvFilter` directive; when absent `RUST_LOG` is used,
/// falling back to `info`. Calling this twice is harmless.
pub fn init_tracing(level: Option<&str>, format: LogFormat) {
    let env_filter = match level {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let ansi = std::io::stderr().is_terminal();

    let _ = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_ansi(ansi).with_writer(std::io::stderr)),
        ),
    };
}
