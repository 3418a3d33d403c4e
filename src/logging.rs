use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const DEFAULT_FILTER: &str = "info";

/// `RUST_LOG` wins, then the configured filter, then [`DEFAULT_FILTER`].
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .filter
            .as_deref()
            .and_then(|filter| EnvFilter::try_new(filter).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    })
}

/// Installs the stderr subscriber. A second call is a no-op.
pub fn init(config: &LogConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
