//! A waitlist signup service.
//!
//! Accepts `POST /api/waitlist` submissions, normalizes and validates them and upserts them
//! into the `waitlist` table keyed by the normalized email.

pub mod app;
pub mod config;
pub mod database;
mod error;
pub mod utils;
pub mod web;

// re-exports
pub use app::{serve, App, AppState};
pub use error::{Error, Result};

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Compact, timeless output with span close events. Defaults to the `debug` level.
pub fn init_dbg_tracing() {
    tracing_subscriber::fmt()
        .without_time()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .compact()
        .init();
}

/// Compact output with timestamps. Reads `RUST_LOG` and defaults to the `info` level.
pub fn init_production_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();
}
