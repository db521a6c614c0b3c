//! Inline retry strategy
//!
//! Every call resolves only once the mutation landed or failed terminally.
//! Session expirations are retried in place per the policy, so the caller's
//! task is suspended for the backoff delays.

use std::sync::Arc;

use async_trait::async_trait;

use arbor_common::{CreateMode, OperationKind, Result, path};

use super::RetryStrategy;
use super::tree::{self, RetryLoop};
use crate::policy::DelayRetryPolicy;
use crate::provider::Provider;

pub struct SyncRetryStrategy {
    provider: Arc<dyn Provider>,
    policy: Arc<DelayRetryPolicy>,
    boundary: String,
}

impl SyncRetryStrategy {
    /// Branch deletion stops at the tree root
    pub fn new(provider: Arc<dyn Provider>, policy: Arc<DelayRetryPolicy>) -> Self {
        Self::with_boundary(provider, policy, path::ROOT)
    }

    /// Branch deletion never removes `boundary` or anything above it
    pub fn with_boundary(
        provider: Arc<dyn Provider>,
        policy: Arc<DelayRetryPolicy>,
        boundary: &str,
    ) -> Self {
        Self {
            provider,
            policy,
            boundary: path::namespace_root(boundary),
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn policy(&self) -> &Arc<DelayRetryPolicy> {
        &self.policy
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    fn retry_loop<'a>(&'a self, kind: OperationKind, path: &'a str) -> RetryLoop<'a> {
        RetryLoop::new(self.provider.as_ref(), self.policy.as_ref(), kind, path)
    }
}

#[async_trait]
impl RetryStrategy for SyncRetryStrategy {
    async fn get_data(&self, key: &str) -> Result<String> {
        let path = self.provider.get_real_path(key);
        let provider = self.provider.as_ref();
        let mut retry = self.retry_loop(OperationKind::Read, &path);
        retry.run(|| provider.get_data(&path)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.provider.get_real_path(key);
        let provider = self.provider.as_ref();
        let mut retry = self.retry_loop(OperationKind::Read, &path);
        retry.run(|| provider.exists(&path)).await
    }

    async fn get_children(&self, key: &str) -> Result<Vec<String>> {
        let path = self.provider.get_real_path(key);
        let provider = self.provider.as_ref();
        let mut retry = self.retry_loop(OperationKind::Read, &path);
        retry.run(|| provider.get_children(&path)).await
    }

    async fn create_current_only(&self, key: &str, value: &str, mode: CreateMode) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::CreateCurrent, &path);
        tree::create_current(&mut retry, &path, value, mode).await
    }

    async fn update(&self, key: &str, value: &str) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::Update, &path);
        tree::update(&mut retry, &path, value).await
    }

    async fn delete_only_current(&self, key: &str) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::DeleteCurrent, &path);
        tree::delete_current(&mut retry, &path).await
    }

    async fn create_all_need_path(&self, key: &str, value: &str, mode: CreateMode) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::CreateAllNeeded, &path);
        tree::create_all_needed(&mut retry, &path, value, mode).await
    }

    async fn delete_all_children(&self, key: &str) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::DeleteAllChildren, &path);
        tree::delete_all_children(&mut retry, &path).await
    }

    async fn delete_current_branch(&self, key: &str) -> Result<()> {
        let path = self.provider.get_real_path(key);
        let mut retry = self.retry_loop(OperationKind::DeleteCurrentBranch, &path);
        tree::delete_current_branch(&mut retry, &path, &self.boundary).await
    }
}
