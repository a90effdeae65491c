use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs JSON structured logging on stdout.
/// The level is taken from `RUST_LOG` and defaults to `info`; records from the
/// `log` crate (actix, the request logger) are bridged into the same output.
pub fn init_telemetry() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .init();
}
