//! Retry strategies over a [`Provider`]
//!
//! | Strategy | On SessionExpired | Caller observes |
//! |----------|-------------------|-----------------|
//! | usual | no retry | `PolicyExhausted` after one attempt |
//! | sync | inline backoff per policy | success, or `PolicyExhausted` once the budget is spent |
//! | async | hand-off to the retry center | `Ok(())` immediately; completion is eventual |
//!
//! All strategies surface non-session failures on first occurrence.

pub mod async_retry;
pub mod sync_retry;
pub(crate) mod tree;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use arbor_common::{ClientError, Configuration, CreateMode, Result, StrategyKind};

pub use async_retry::AsyncRetryStrategy;
pub use sync_retry::SyncRetryStrategy;

use crate::center::AsyncRetryCenter;
use crate::policy::DelayRetryPolicy;
use crate::provider::Provider;

/// Tree operations with session-expiration handling
///
/// Keys are resolved to real paths through the Provider. Creating a node
/// that already exists and deleting one that is already gone succeed.
#[async_trait]
pub trait RetryStrategy: Send + Sync {
    async fn get_data(&self, key: &str) -> Result<String>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get_children(&self, key: &str) -> Result<Vec<String>>;

    /// Create the node; its parent must already exist
    async fn create_current_only(&self, key: &str, value: &str, mode: CreateMode) -> Result<()>;

    async fn update(&self, key: &str, value: &str) -> Result<()>;

    async fn delete_only_current(&self, key: &str) -> Result<()>;

    /// Create missing ancestors (persistent, empty) top-down, then the node
    async fn create_all_need_path(&self, key: &str, value: &str, mode: CreateMode) -> Result<()>;

    /// Delete every descendant, leaving the node itself
    async fn delete_all_children(&self, key: &str) -> Result<()>;

    /// Delete the node and its subtree, then each ancestor left childless
    /// down to (not including) the configured boundary
    ///
    /// Fails with `InvalidPath`, touching nothing, when the node is the
    /// boundary or one of its ancestors.
    async fn delete_current_branch(&self, key: &str) -> Result<()>;
}

/// Build the strategy selected by configuration
///
/// The async strategy needs the shared `center`, normally built once with
/// [`AsyncRetryCenter::from_configuration`]; passing `None` for it is a
/// configuration error.
pub fn build_strategy(
    config: &Configuration,
    provider: Arc<dyn Provider>,
    center: Option<Arc<AsyncRetryCenter>>,
) -> Result<Arc<dyn RetryStrategy>> {
    let kind = config.strategy()?;
    let policy = Arc::new(DelayRetryPolicy::from_configuration(config));
    let boundary = config.branch_boundary();
    info!(strategy = %kind, boundary = %boundary, "Building retry strategy");

    let strategy: Arc<dyn RetryStrategy> = match kind {
        StrategyKind::Usual => Arc::new(SyncRetryStrategy::with_boundary(
            provider,
            Arc::new(DelayRetryPolicy::no_retry()),
            &boundary,
        )),
        StrategyKind::Sync => Arc::new(SyncRetryStrategy::with_boundary(
            provider, policy, &boundary,
        )),
        StrategyKind::Async => {
            let center = center.ok_or_else(|| {
                ClientError::Config("async strategy requires a retry center".to_string())
            })?;
            let inline_policy = if config.async_inline_retries() {
                policy.clone()
            } else {
                Arc::new(DelayRetryPolicy::no_retry())
            };
            let inner = SyncRetryStrategy::with_boundary(provider, inline_policy, &boundary);
            Arc::new(AsyncRetryStrategy::wrap(inner, policy, center)?)
        }
    };
    Ok(strategy)
}
