//! Ready-made subscriber for binaries embedding `henka`.

use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global subscriber printing to stderr, with progress bars for
/// the batches run by [`ParallelQueue`](crate::ParallelQueue).
///
/// Use the `RUST_LOG` environment variable to override the default `info`
/// filter.
pub fn init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let indicatif = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(indicatif.get_stderr_writer())
                .with_target(false),
        )
        .with(indicatif)
        .try_init()
}
