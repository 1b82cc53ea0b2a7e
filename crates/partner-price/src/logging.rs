//! Logging setup
//!
//! Logs go to stderr so table and JSON output on stdout stay clean. `RUST_LOG`
//! wins over the verbosity flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter for a `-v` count
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info,partner_price_core=debug",
        _ => "debug",
    }
}

/// Initialize the global subscriber
pub fn init_logging(verbose: u8, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 1)
                .with_ansi(!no_color),
        )
        .init();
}
