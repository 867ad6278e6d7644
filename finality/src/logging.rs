//! # Log Setup for Proof Storage
//!
//! The crate only emits `tracing` events and never installs a subscriber
//! on its own; the embedding node owns the global one. [`init_logging`]
//! exists for tools and tests that link this crate alone.
//!
//! Because it is a library call, a second install returns
//! [`TryInitError`] instead of panicking, and output goes to stderr so it
//! never mixes with a tool's stdout. Thread ids are on, since the events
//! worth reading are lock hand-offs between threads:
//!
//! | Level   | Events                                           |
//! |---------|--------------------------------------------------|
//! | `trace` | every view and modifier acquire and release      |
//! | `debug` | lookups that miss by point or height             |
//! | `info`  | committed proofs, opened engines                 |
//! | `warn`  | saves rejected by the engine                     |
//!
//! ```text
//! RUST_LOG=nova_finality::cache=trace   # follow lock hand-offs only
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl LogFormat {
    /// Accepts "json" or "pretty" (case-insensitive). Anything else is
    /// `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `default_level` applies when `RUST_LOG` is unset. Fails if a global
/// subscriber is already installed, which leaves the existing one in place.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()?,
    }

    tracing::info!("logging initialized (format={:?})", format);
    Ok(())
}
