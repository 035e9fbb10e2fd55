//! Runway projects an account's balance forward by merging posted
//! transactions, recurring schedules and forecast irregular spending into one
//! running-balance ledger.

pub mod categorizer;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod fmt;
pub mod forecaster;
pub mod learner;
pub mod models;
pub mod projection;
pub mod recurrence;
pub mod settings;
pub mod store;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Installs the stderr subscriber once. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runway=warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_tracing_twice_does_not_panic() {
        super::init_tracing();
        super::init_tracing();
    }
}
