//! Configuration management for Arbor
//!
//! Settings are read from an optional configuration file layered under
//! environment variables. Environment keys use `__` as the level separator
//! and keep their prefix, so `ARBOR__RETRY__STRATEGY=async` sets
//! `arbor.retry.strategy`. Keys containing `-` can only come from the file.

use config::{Config, Environment};

use crate::StrategyKind;
use crate::error::{ClientError, Result};
use crate::path;

pub const NAMESPACE: &str = "arbor.registry.namespace";
pub const RETRY_STRATEGY: &str = "arbor.retry.strategy";
pub const RETRY_MAX_RETRIES: &str = "arbor.retry.max-retries";
pub const RETRY_BASE_DELAY_MS: &str = "arbor.retry.base-delay-ms";
pub const RETRY_MULTIPLIER: &str = "arbor.retry.multiplier";
pub const RETRY_MAX_DELAY_MS: &str = "arbor.retry.max-delay-ms";
pub const ASYNC_INLINE_RETRIES: &str = "arbor.retry.async.inline-retries";
pub const ASYNC_WORKERS: &str = "arbor.retry.async.workers";
pub const BRANCH_BOUNDARY: &str = "arbor.branch.boundary";

pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 10;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;
pub const DEFAULT_ASYNC_WORKERS: usize = 1;

/// Application configuration wrapper
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Create a configuration from a prepared Config instance
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Load settings from `file` (any format the config crate detects by
    /// extension) with environment overrides
    pub fn load(file: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("arbor")
                    .prefix_separator("__")
                    .separator("__")
                    .keep_prefix(true)
                    .try_parsing(true),
            )
            .build()?;
        Ok(Self { config })
    }

    // ===================== Registry =====================

    /// Namespace root prepended to every key (default: none)
    pub fn namespace(&self) -> String {
        self.config.get_string(NAMESPACE).unwrap_or_default()
    }

    /// Upward deletion stops at this path (default: the namespace root)
    pub fn branch_boundary(&self) -> String {
        self.config
            .get_string(BRANCH_BOUNDARY)
            .map(|b| path::namespace_root(&b))
            .unwrap_or_else(|_| path::namespace_root(&self.namespace()))
    }

    // ===================== Retry =====================

    pub fn strategy(&self) -> Result<StrategyKind> {
        match self.config.get_string(RETRY_STRATEGY) {
            Ok(value) => value.parse().map_err(ClientError::Config),
            Err(config::ConfigError::NotFound(_)) => Ok(StrategyKind::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Retry budget, `None` means unbounded (configured as a negative number)
    pub fn max_retries(&self) -> Option<u32> {
        let value = self
            .config
            .get_int(RETRY_MAX_RETRIES)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        if value < 0 {
            None
        } else {
            Some(value.min(u32::MAX as i64) as u32)
        }
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.config
            .get_int(RETRY_BASE_DELAY_MS)
            .map(|v| v.max(0) as u64)
            .unwrap_or(DEFAULT_BASE_DELAY_MS)
    }

    pub fn multiplier(&self) -> f64 {
        self.config
            .get_float(RETRY_MULTIPLIER)
            .unwrap_or(DEFAULT_MULTIPLIER)
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.config
            .get_int(RETRY_MAX_DELAY_MS)
            .map(|v| v.max(0) as u64)
            .unwrap_or(DEFAULT_MAX_DELAY_MS)
    }

    /// Whether the async strategy retries inline before handing off
    pub fn async_inline_retries(&self) -> bool {
        self.config.get_bool(ASYNC_INLINE_RETRIES).unwrap_or(false)
    }

    /// Number of operations the retry center replays concurrently
    pub fn async_workers(&self) -> usize {
        self.config
            .get_int(ASYNC_WORKERS)
            .map(|v| v.max(1) as usize)
            .unwrap_or(DEFAULT_ASYNC_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.namespace(), "");
        assert_eq!(config.branch_boundary(), "/");
        assert_eq!(config.strategy().unwrap(), StrategyKind::Sync);
        assert_eq!(config.max_retries(), Some(3));
        assert_eq!(config.base_delay_ms(), 10);
        assert_eq!(config.multiplier(), 2.0);
        assert_eq!(config.max_delay_ms(), 1000);
        assert!(!config.async_inline_retries());
        assert_eq!(config.async_workers(), 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::builder()
            .set_override(NAMESPACE, "orchestration")
            .unwrap()
            .set_override(RETRY_STRATEGY, "async")
            .unwrap()
            .set_override(RETRY_MAX_RETRIES, -1)
            .unwrap()
            .set_override(ASYNC_WORKERS, 0)
            .unwrap()
            .build()
            .unwrap();
        let config = Configuration::from_config(config);

        assert_eq!(config.namespace(), "orchestration");
        assert_eq!(config.branch_boundary(), "/orchestration");
        assert_eq!(config.strategy().unwrap(), StrategyKind::Async);
        assert_eq!(config.max_retries(), None);
        assert_eq!(config.async_workers(), 1);
    }

    #[test]
    fn test_invalid_strategy() {
        let config = Config::builder()
            .set_override(RETRY_STRATEGY, "eventually")
            .unwrap()
            .build()
            .unwrap();
        let config = Configuration::from_config(config);
        assert!(matches!(config.strategy(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "arbor:\n  registry:\n    namespace: demo\n  retry:\n    max-retries: 5\n    base-delay-ms: 20\n  branch:\n    boundary: /demo/config"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Configuration::load(Some(&path)).unwrap();
        assert_eq!(config.namespace(), "demo");
        assert_eq!(config.max_retries(), Some(5));
        assert_eq!(config.base_delay_ms(), 20);
        assert_eq!(config.branch_boundary(), "/demo/config");
    }

    #[test]
    fn test_load_from_environment() {
        // no other test in this crate reads the strategy through `load`
        unsafe { std::env::set_var("ARBOR__RETRY__STRATEGY", "async") };
        let config = Configuration::load(None).unwrap();
        unsafe { std::env::remove_var("ARBOR__RETRY__STRATEGY") };

        assert_eq!(config.strategy().unwrap(), StrategyKind::Async);
    }
}
