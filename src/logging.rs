//! Logging initialization
//!
//! Structured logging via tracing; the host binary calls [`init`] once
//! at startup. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cardway={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
