use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKMASTER_LOG";

/// Installs the stderr subscriber. `TASKMASTER_LOG` takes precedence over the
/// configured level; calling this twice is harmless.
pub fn init(fallback_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
