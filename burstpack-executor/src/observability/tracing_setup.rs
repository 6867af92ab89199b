//! Subscriber installation.

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use super::config::{LogFormat, TracingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Returned by [`init_tracing`]; keep it alive for the life of the program.
#[derive(Debug)]
pub struct TracingGuard {
    format: LogFormat,
}

impl TracingGuard {
    /// The format the subscriber was installed with.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

/// Install the global subscriber described by `config`.
///
/// An invalid filter falls back to `info`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(TracingGuard {
        format: config.log_format(),
    })
}

fn fmt_layer(config: &TracingConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_file(config.include_location())
        .with_line_number(config.include_location())
        .with_target(config.include_target())
        .with_thread_names(config.include_thread_names())
        .with_thread_ids(config.include_thread_ids());

    match config.log_format() {
        LogFormat::Json => layer
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}
