//! Tracing subscriber setup for the Tuneline binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary so embedders keep control over their own logging.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "tuneline=debug,sqlx=warn,reqwest=info,warn";

/// Initialize the logging system.
///
/// Events are written to stderr. The log level can be controlled via the
/// `RUST_LOG` environment variable and falls back to [`DEFAULT_LOG_FILTER`].
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized");

    Ok(())
}
