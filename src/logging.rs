//! Tracing/logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global `tracing` subscriber. Honors `RUST_LOG`; falls back
/// to `info` for the crate and `warn` for sqlx/sea_orm query spam.
pub fn init_logging() {
    let default_filter = "info,orchestration_api=debug,sqlx::query=warn,sea_orm::query=warn";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
