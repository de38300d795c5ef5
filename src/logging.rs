//! Logging setup. Logs go to stderr; stdout carries JSON results only.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber. `RUST_LOG` wins over `verbose`.
/// A failed init is reported on stderr and the run continues unlogged.
pub(crate) fn init_logging(verbose: bool) {
    if let Err(err) = try_init_logging(verbose) {
        eprintln!("logging init failed: {err}");
    }
}

fn try_init_logging(verbose: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,evidence_notary=debug"
    } else {
        "warn"
    }
}
