use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Levels come from `RUST_LOG`, `info` when
/// unset.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).with_line_number(true);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
