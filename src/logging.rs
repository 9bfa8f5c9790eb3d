use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with console output.
///
/// Diagnostics (progress counts, skipped records, per-file announcements) go
/// to stderr through this subscriber so that record output on stdout stays
/// clean.
pub fn init_logging() {
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("datapipe=info".parse().unwrap()))
        .with(console_layer)
        .init();
}
