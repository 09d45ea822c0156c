// Tracing subscriber setup
// Logs go to stderr; stdout is reserved for user-facing messages.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the fmt layer: `json`, `pretty` or `compact` (default)
pub const LOG_FORMAT_ENV: &str = "WAITFOR_LOG_FORMAT";

pub fn init(verbose: bool) {
    let default_directive = if verbose { "waitfor=debug" } else { "waitfor=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}
