//! Multi-step tree walks shared by the inline strategy and operation replay
//!
//! Each walk is a sequence of single Provider calls. Every call goes through
//! a [`RetryLoop`], so a session expiration resumes the walk at the step that
//! was interrupted instead of restarting it. Steps are individually
//! idempotent: creating an existing node and deleting an absent one count as
//! done.

use std::future::Future;

use tracing::{debug, warn};

use arbor_common::{ClientError, CreateMode, ErrorKind, OperationKind, Result, path};

use crate::policy::{DelayRetryPolicy, RetryDecision};
use crate::provider::Provider;

/// Retry bookkeeping for one logical call
///
/// With a policy, SessionExpired is retried inline until the budget runs out
/// and then surfaces as `PolicyExhausted`. Without one, SessionExpired is
/// returned untouched after a single attempt.
pub(crate) struct RetryLoop<'a> {
    provider: &'a dyn Provider,
    policy: Option<&'a DelayRetryPolicy>,
    kind: OperationKind,
    path: &'a str,
    retries: u32,
}

impl<'a> RetryLoop<'a> {
    pub(crate) fn new(
        provider: &'a dyn Provider,
        policy: &'a DelayRetryPolicy,
        kind: OperationKind,
        path: &'a str,
    ) -> Self {
        Self {
            provider,
            policy: Some(policy),
            kind,
            path,
            retries: 0,
        }
    }

    /// Single attempt per step, used when the retry center owns the budget
    pub(crate) fn once(provider: &'a dyn Provider, kind: OperationKind, path: &'a str) -> Self {
        Self {
            provider,
            policy: None,
            kind,
            path,
            retries: 0,
        }
    }

    pub(crate) fn provider(&self) -> &'a dyn Provider {
        self.provider
    }

    #[cfg(test)]
    pub(crate) fn retries(&self) -> u32 {
        self.retries
    }

    pub(crate) async fn run<T, F, Fut>(&mut self, mut step: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            let err = match step().await {
                Err(e) if e.is_session_expired() => e,
                other => return other,
            };
            let Some(policy) = self.policy else {
                return Err(err);
            };

            match policy.decide(self.retries) {
                RetryDecision::Retry(delay) => {
                    self.retries += 1;
                    warn!(
                        kind = %self.kind,
                        path = self.path,
                        retry = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        "Session expired, retrying inline"
                    );
                    metrics::counter!("arbor_retry_attempts_total", "kind" => self.kind.as_str())
                        .increment(1);
                    if let Err(e) = self.provider.reset_connection().await {
                        debug!("Failed to reset connection before retry: {}", e);
                    }
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    warn!(
                        kind = %self.kind,
                        path = self.path,
                        retries = self.retries,
                        "Session expired, retry budget exhausted"
                    );
                    return Err(ClientError::PolicyExhausted {
                        kind: self.kind,
                        path: self.path.to_string(),
                        retries: self.retries,
                    });
                }
            }
        }
    }
}

/// Map a conflict the caller considers already done to success
fn tolerate(result: Result<()>, done: ErrorKind) -> Result<()> {
    match result {
        Err(e) if e.kind() == done => Ok(()),
        other => other,
    }
}

pub(crate) async fn create_current(
    retry: &mut RetryLoop<'_>,
    path: &str,
    value: &str,
    mode: CreateMode,
) -> Result<()> {
    let provider = retry.provider();
    let result = retry.run(|| provider.create(path, value, mode)).await;
    tolerate(result, ErrorKind::NodeExists)
}

pub(crate) async fn update(retry: &mut RetryLoop<'_>, path: &str, value: &str) -> Result<()> {
    let provider = retry.provider();
    retry.run(|| provider.update(path, value)).await
}

pub(crate) async fn delete_current(retry: &mut RetryLoop<'_>, path: &str) -> Result<()> {
    let provider = retry.provider();
    let result = retry.run(|| provider.delete(path)).await;
    tolerate(result, ErrorKind::NoNode)
}

/// Create every missing ancestor (persistent, empty), then the node itself
pub(crate) async fn create_all_needed(
    retry: &mut RetryLoop<'_>,
    path: &str,
    value: &str,
    mode: CreateMode,
) -> Result<()> {
    let provider = retry.provider();
    for ancestor in path::ancestors(path) {
        let ancestor = ancestor.as_str();
        if retry.run(|| provider.exists(ancestor)).await? {
            continue;
        }
        let result = retry
            .run(|| provider.create(ancestor, "", CreateMode::Persistent))
            .await;
        tolerate(result, ErrorKind::NodeExists)?;
    }
    create_current(retry, path, value, mode).await
}

/// Every descendant of `path`, ordered so each node precedes its parent
async fn collect_descendants(retry: &mut RetryLoop<'_>, path: &str) -> Result<Vec<String>> {
    let provider = retry.provider();
    let mut discovered = Vec::new();
    let mut stack = vec![path.to_string()];

    while let Some(current) = stack.pop() {
        let current = current.as_str();
        let children = match retry.run(|| provider.get_children(current)).await {
            Ok(children) => children,
            Err(e) if e.kind() == ErrorKind::NoNode => continue,
            Err(e) => return Err(e),
        };
        for child in children {
            let child_path = path::join(current, &child);
            discovered.push(child_path.clone());
            stack.push(child_path);
        }
    }

    discovered.reverse();
    Ok(discovered)
}

/// Remove all descendants of `path`, deepest first; `path` stays
pub(crate) async fn delete_all_children(retry: &mut RetryLoop<'_>, path: &str) -> Result<()> {
    let descendants = collect_descendants(retry, path).await?;
    for descendant in &descendants {
        delete_current(retry, descendant).await?;
    }
    Ok(())
}

/// Remove `path` with its subtree, then every ancestor left childless,
/// stopping at `boundary` (exclusive) or the first ancestor still in use
///
/// A `path` that is the boundary or one of its ancestors is rejected before
/// anything is touched.
pub(crate) async fn delete_current_branch(
    retry: &mut RetryLoop<'_>,
    path: &str,
    boundary: &str,
) -> Result<()> {
    if path::is_within(boundary, path) {
        return Err(ClientError::InvalidPath(format!(
            "{} would remove branch boundary {}",
            path, boundary
        )));
    }
    delete_all_children(retry, path).await?;
    delete_current(retry, path).await?;

    let provider = retry.provider();
    let mut current = path::parent(path);
    while let Some(ancestor) = current {
        if !path::is_below(ancestor, boundary) {
            break;
        }
        let children = match retry.run(|| provider.get_children(ancestor)).await {
            Ok(children) => children,
            Err(e) if e.kind() == ErrorKind::NoNode => {
                current = path::parent(ancestor);
                continue;
            }
            Err(e) => return Err(e),
        };
        if !children.is_empty() {
            break;
        }
        match retry.run(|| provider.delete(ancestor)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NoNode => {}
            // someone created a child in the meantime
            Err(ClientError::NotEmpty(_)) => break,
            Err(e) => return Err(e),
        }
        current = path::parent(ancestor);
    }
    Ok(())
}
