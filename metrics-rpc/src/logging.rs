use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. Filter comes from `RUST_LOG`, defaulting
/// to `info`. Output goes to stderr; stdout is reserved for program output.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
