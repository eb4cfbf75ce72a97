//! Diagnostic logging setup for the binary.
//!
//! Library code only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. Diagnostics go to stderr so command output on
//! stdout stays pipeable.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `--verbose` selects `debug` and the
/// default is `warn`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
