use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured default.
/// Safe to call more than once; later calls are ignored.
pub fn init(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.default_filter));

    let result = if logging.json_output() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if result.is_ok() {
        tracing::debug!(
            json = logging.json_output(),
            loki = logging.enable_loki,
            logtail = logging.enable_logtail,
            "logging initialised"
        );
    }
}
