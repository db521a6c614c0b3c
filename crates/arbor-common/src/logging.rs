//! Logging bootstrap
//!
//! The client only emits `tracing` events; embedders that have no subscriber
//! of their own can install a console one here. `RUST_LOG` takes precedence
//! over the filter passed in.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Install a console subscriber, returning `false` if one was already set
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init("arbor=debug");
        assert!(!init("arbor=debug"));
    }
}
