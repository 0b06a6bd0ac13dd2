//! Developer diagnostics for the orchestrator.
//!
//! - **Tracing (this module)**: dev diagnostics via `RUST_LOG`, written to stderr.
//!   Not persisted.
//! - **Trajectory (`mission::MissionRecord::log`)**: the mission's audit log, persisted
//!   with the record. Always written, unaffected by `RUST_LOG`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: `RUST_LOG` filter (default `warn`), compact stderr.
///
/// # Example
/// ```bash
/// RUST_LOG=sentinel=info sentinel "network outage"
/// ```
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
