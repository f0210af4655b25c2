//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, prelude::*};

/// Install the global subscriber, filtered by `RUST_LOG`
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_line_number(true)
                .with_file(true),
        )
        .init();
}

/// Like [`init`], but quietly does nothing if a subscriber is already set
pub fn try_init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_line_number(true)
                .with_file(true),
        )
        .try_init();
}
