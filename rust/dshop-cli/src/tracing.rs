//! Tracing initialization for the CLI

/// Install the fmt subscriber
///
/// The `DSHOP_TRACE` environment variable selects the level (default
/// "info"); standard `RUST_LOG`-style directives are accepted too.
pub fn init_tracing() -> Result<(), String> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let trace_level = std::env::var("DSHOP_TRACE")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match trace_level.as_str() {
        "error" => EnvFilter::new("error"),
        "warn" => EnvFilter::new("warn"),
        "info" => EnvFilter::new("info"),
        "debug" => EnvFilter::new("debug"),
        "trace" => EnvFilter::new("trace"),
        "1" | "true" | "yes" => EnvFilter::new("debug"),
        "0" | "false" | "no" => EnvFilter::new("error"),
        other => EnvFilter::try_new(other).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .try_init()
        .map_err(|e| format!("Failed to initialize tracing: {}", e))
}
