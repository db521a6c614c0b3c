//! Asynchronous-completion retry strategy
//!
//! Wraps a [`SyncRetryStrategy`] and intercepts its terminal session
//! expiration: instead of failing the caller, the mutation is handed to the
//! [`AsyncRetryCenter`] as an [`Operation`] and the call returns `Ok(())`.
//!
//! `Ok(())` from a mutation therefore means "accepted", not "landed". The
//! mutation may still be pending, and if the center's budget runs out it is
//! dropped and reported through logs only. Reads and non-session failures
//! behave exactly like the inline strategy.

use std::sync::Arc;

use async_trait::async_trait;

use arbor_common::{CreateMode, Result};

use super::RetryStrategy;
use super::sync_retry::SyncRetryStrategy;
use crate::center::AsyncRetryCenter;
use crate::operation::{Mutation, Operation};
use crate::policy::DelayRetryPolicy;
use crate::provider::Provider;

pub struct AsyncRetryStrategy {
    inner: SyncRetryStrategy,
    center: Arc<AsyncRetryCenter>,
}

impl AsyncRetryStrategy {
    /// One inline attempt, then the center takes over with `policy`
    pub fn new(
        provider: Arc<dyn Provider>,
        policy: Arc<DelayRetryPolicy>,
        center: Arc<AsyncRetryCenter>,
    ) -> Result<Self> {
        let inline = SyncRetryStrategy::new(provider, Arc::new(DelayRetryPolicy::no_retry()));
        Self::wrap(inline, policy, center)
    }

    /// Use `inner` for the inline attempt(s); its own policy decides how many
    /// local retries happen before hand-off
    ///
    /// Initializes and starts the center; both steps are no-ops if another
    /// strategy already did them.
    pub fn wrap(
        inner: SyncRetryStrategy,
        policy: Arc<DelayRetryPolicy>,
        center: Arc<AsyncRetryCenter>,
    ) -> Result<Self> {
        center.init(policy);
        center.start()?;
        Ok(Self { inner, center })
    }

    pub fn inner(&self) -> &SyncRetryStrategy {
        &self.inner
    }

    pub fn center(&self) -> &Arc<AsyncRetryCenter> {
        &self.center
    }

    fn real_path(&self, key: &str) -> String {
        self.inner.provider().get_real_path(key)
    }

    /// Hand the mutation to the center on terminal session expiration
    fn defer(&self, result: Result<()>, mutation: impl FnOnce() -> Mutation) -> Result<()> {
        match result {
            Err(e) if e.is_policy_exhausted() => {
                let operation = Operation::new(self.inner.provider().clone(), mutation());
                self.center.add(operation);
                Ok(())
            }
            other => other,
        }
    }
}

#[async_trait]
impl RetryStrategy for AsyncRetryStrategy {
    async fn get_data(&self, key: &str) -> Result<String> {
        self.inner.get_data(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn get_children(&self, key: &str) -> Result<Vec<String>> {
        self.inner.get_children(key).await
    }

    async fn create_current_only(&self, key: &str, value: &str, mode: CreateMode) -> Result<()> {
        let result = self.inner.create_current_only(key, value, mode).await;
        self.defer(result, || Mutation::CreateCurrent {
            path: self.real_path(key),
            value: value.to_string(),
            mode,
        })
    }

    async fn update(&self, key: &str, value: &str) -> Result<()> {
        let result = self.inner.update(key, value).await;
        self.defer(result, || Mutation::Update {
            path: self.real_path(key),
            value: value.to_string(),
        })
    }

    async fn delete_only_current(&self, key: &str) -> Result<()> {
        let result = self.inner.delete_only_current(key).await;
        self.defer(result, || Mutation::DeleteCurrent {
            path: self.real_path(key),
        })
    }

    async fn create_all_need_path(&self, key: &str, value: &str, mode: CreateMode) -> Result<()> {
        let result = self.inner.create_all_need_path(key, value, mode).await;
        self.defer(result, || Mutation::CreateAllNeeded {
            path: self.real_path(key),
            value: value.to_string(),
            mode,
        })
    }

    async fn delete_all_children(&self, key: &str) -> Result<()> {
        let result = self.inner.delete_all_children(key).await;
        self.defer(result, || Mutation::DeleteAllChildren {
            path: self.real_path(key),
        })
    }

    async fn delete_current_branch(&self, key: &str) -> Result<()> {
        let result = self.inner.delete_current_branch(key).await;
        self.defer(result, || Mutation::DeleteCurrentBranch {
            path: self.real_path(key),
            boundary: self.inner.boundary().to_string(),
        })
    }
}
