//! Logging and tracing initialization.
//!
//! Structured logging through the `tracing` ecosystem, either as pretty
//! console output or as JSON for log aggregation. Orchestrator spans carry
//! the request id, so every record of a call can be correlated.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for the logging system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> String {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    format!(
        "{}={}",
        env!("CARGO_CRATE_NAME"),
        level.as_str().to_lowercase()
    )
}

/// Install the global subscriber.
///
/// Call once, early in main(), after config is loaded. `RUST_LOG` overrides
/// [`default_directive`]. JSON records are flattened and carry the fields of
/// the innermost span, so `request_id` and `operation` sit next to the message.
pub fn init(config: LogConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.verbose)));

    let json = config.json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
    });
    let pretty = (!config.json).then(|| fmt::layer().with_target(false).compact());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .try_init()?;
    Ok(())
}
