//! Tracing subscriber installation and logging configuration.
//!
//! # Design
//! - One entry point installs an fmt subscriber (pretty or JSON).
//! - `RUST_LOG` overrides the configured level when present.
//! - Output goes to stderr so command results on stdout stay machine-readable.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default logging level when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// Calling this again after a successful install is a no-op.
///
/// # Errors
///
/// Returns an error if another subscriber has already been installed globally
/// by someone else.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = build_env_filter(config.level);
    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
    INSTALLED.set(config.format).ok();
    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Level directive (e.g. `info`, `clinic_console=debug`).
    pub level: &'a str,
    /// Output format for the subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON objects, one per line.
    Json,
    /// Human-readable output.
    Pretty,
}

impl LogFormat {
    /// Pretty for debug builds, JSON for release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            "auto" => Ok(Self::infer()),
            other => Err(format!("unknown log format '{other}' (expected json, pretty or auto)")),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

/// Span wrapping one CLI command so every event carries the command and request id.
#[must_use]
pub fn command_span(command: &str, request_id: &str) -> Span {
    tracing::info_span!("command", command = %command, request_id = %request_id)
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
