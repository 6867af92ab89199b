//! Logging setup for burstpack processes.
//!
//! Every crate in the workspace logs through `tracing`; this module
//! installs the subscriber that formats those events.
//!
//! # Configuration
//!
//! The output format is controlled via `BURSTPACK_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line, human-readable
//! - `compact` - single-line (default)
//!
//! The filter comes from `BURSTPACK_LOG_LEVEL`, falling back to `RUST_LOG`.
//!
//! # Example
//!
//! ```ignore
//! use burstpack_executor::observability::{init_tracing, TracingConfig};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//!
//! let config = TracingConfig::builder()
//!     .verbosity(2)
//!     .log_format(LogFormat::Json)
//!     .build();
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{init_tracing, TracingGuard};

/// Span covering one stage run.
#[macro_export]
macro_rules! instrument_run {
    ($run_id:expr, $lane_width:expr, $burst_size:expr) => {
        tracing::info_span!(
            "stage_run",
            run_id = %$run_id,
            lane_width = $lane_width,
            burst_size = $burst_size
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.log_filter(), "info");
        assert!(!config.include_location());
    }

    #[test]
    fn config_builder() {
        let config = TracingConfig::builder()
            .log_format(LogFormat::Json)
            .log_filter("burstpack_core=trace")
            .include_thread_ids(true)
            .build();

        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.log_filter(), "burstpack_core=trace");
        assert!(config.include_thread_ids());
        assert!(!config.include_thread_names());
    }

    #[test]
    fn verbosity_sets_filter() {
        assert_eq!(TracingConfig::builder().verbosity(0).build().log_filter(), "warn");
        assert_eq!(TracingConfig::builder().verbosity(1).build().log_filter(), "info");
        assert_eq!(
            TracingConfig::builder().verbosity(2).build().log_filter(),
            "info,burstpack_core=debug,burstpack_executor=debug"
        );
        assert_eq!(TracingConfig::builder().verbosity(9).build().log_filter(), "trace");
    }
}
