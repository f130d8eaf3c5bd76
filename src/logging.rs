//! logging
//!
//! Diagnostic tracing for the binary.
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber. Diagnostics go to stderr so a pipeline command's stdout is
//! passed through untouched.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` for this crate
/// when `--debug` is given.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "warn,doltrun=debug"
    } else {
        "warn"
    }
}

/// Initialize the tracing subscriber.
///
/// Output: stderr, compact format. Calling this twice is harmless.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_crate_level() {
        assert_eq!(default_directive(false), "warn");
        assert!(default_directive(true).contains("doltrun=debug"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
