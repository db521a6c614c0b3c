//! Background retry center
//!
//! Owns the queue of operations whose inline attempt ended in a session
//! expiration and replays them until they succeed or the retry budget runs
//! out. One center is created at system start and shared by every
//! asynchronous strategy through an `Arc`.
//!
//! Lifecycle is two-phase: [`AsyncRetryCenter::init`] fixes the policy (first
//! caller wins) and [`AsyncRetryCenter::start`] launches the worker (later
//! calls are no-ops). Operations added before `start` wait in the queue.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use arbor_common::{ClientError, Configuration, Result};

use crate::operation::Operation;
use crate::policy::{DelayRetryPolicy, RetryDecision};

/// Point-in-time view of the center's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CenterStats {
    /// Operations accepted through `add`
    pub enqueued: u64,
    /// Replays rescheduled after another session expiration
    pub retried: u64,
    pub succeeded: u64,
    pub dropped: u64,
    /// Accepted but not yet succeeded or dropped
    pub pending: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    retried: AtomicU64,
    succeeded: AtomicU64,
    dropped: AtomicU64,
    pending: AtomicU64,
}

/// Queue of pending operations plus the worker that drains it
pub struct AsyncRetryCenter {
    policy: OnceLock<Arc<DelayRetryPolicy>>,
    started: AtomicBool,
    workers: usize,
    tx: mpsc::UnboundedSender<Operation>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Operation>>>,
    counters: Counters,
    idle: Notify,
}

impl AsyncRetryCenter {
    /// Create a center replaying up to `workers` operations at a time
    pub fn new(workers: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            policy: OnceLock::new(),
            started: AtomicBool::new(false),
            workers: workers.max(1),
            tx,
            rx: Mutex::new(Some(rx)),
            counters: Counters::default(),
            idle: Notify::new(),
        })
    }

    /// Create a center sized by `arbor.retry.async.workers` and initialized
    /// with the configured retry policy
    pub fn from_configuration(config: &Configuration) -> Arc<Self> {
        let center = Self::new(config.async_workers());
        center.init(Arc::new(DelayRetryPolicy::from_configuration(config)));
        center
    }

    /// Maximum number of operations replayed at once
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Set the shared policy; returns `false` if one was already set
    pub fn init(&self, policy: Arc<DelayRetryPolicy>) -> bool {
        let accepted = self.policy.set(policy).is_ok();
        if accepted {
            info!("Async retry center initialized");
        }
        accepted
    }

    pub fn policy(&self) -> Option<&Arc<DelayRetryPolicy>> {
        self.policy.get()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Launch the worker on the current tokio runtime
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let policy = self
            .policy
            .get()
            .cloned()
            .ok_or_else(|| ClientError::Config("retry center started before init".to_string()))?;
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ClientError::Config(format!("retry center needs a tokio runtime: {}", e))
        })?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(rx) = self.rx.lock().take() else {
            return Ok(());
        };

        info!(workers = self.workers, "Starting async retry center");
        handle.spawn(Self::run(self.clone(), rx, policy));
        Ok(())
    }

    /// Hand an operation to the center; never waits on the worker
    pub fn add(&self, operation: Operation) {
        warn!(
            kind = %operation.kind(),
            path = operation.path(),
            "Operation queued for async retry"
        );
        metrics::counter!("arbor_retry_enqueued_total", "kind" => operation.kind().as_str())
            .increment(1);
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        self.enqueue(operation);
    }

    pub fn stats(&self) -> CenterStats {
        CenterStats {
            enqueued: self.counters.enqueued.load(Ordering::SeqCst),
            retried: self.counters.retried.load(Ordering::SeqCst),
            succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            dropped: self.counters.dropped.load(Ordering::SeqCst),
            pending: self.counters.pending.load(Ordering::SeqCst),
        }
    }

    pub fn pending(&self) -> u64 {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Resolve once every accepted operation has succeeded or been dropped
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn enqueue(&self, operation: Operation) {
        if let Err(e) = self.tx.send(operation) {
            // only possible once the worker is gone
            let operation = e.0;
            error!(
                kind = %operation.kind(),
                path = operation.path(),
                "Retry queue closed, dropping operation"
            );
            self.finish_dropped(&operation, "queue_closed");
        }
    }

    async fn run(
        center: Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<Operation>,
        policy: Arc<DelayRetryPolicy>,
    ) {
        let limiter = Arc::new(Semaphore::new(center.workers));
        while let Some(operation) = rx.recv().await {
            let Ok(permit) = limiter.clone().acquire_owned().await else {
                break;
            };
            let center = center.clone();
            let policy = policy.clone();
            tokio::spawn(async move {
                center.process(operation, &policy).await;
                drop(permit);
            });
        }
        debug!("Async retry center worker stopped");
    }

    async fn process(self: &Arc<Self>, mut operation: Operation, policy: &DelayRetryPolicy) {
        let err = match operation.execute().await {
            Ok(()) => {
                debug!(
                    kind = %operation.kind(),
                    path = operation.path(),
                    retries = operation.retries(),
                    "Async retry succeeded"
                );
                metrics::counter!("arbor_retry_succeeded_total", "kind" => operation.kind().as_str())
                    .increment(1);
                self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
                self.finish();
                return;
            }
            Err(e) => e,
        };

        if !err.is_session_expired() {
            warn!(
                kind = %operation.kind(),
                path = operation.path(),
                error = %err,
                "Dropping operation after non-retryable failure"
            );
            self.finish_dropped(&operation, "non_retryable");
            return;
        }

        match policy.decide(operation.retries()) {
            RetryDecision::Retry(delay) => {
                operation.record_retry();
                warn!(
                    kind = %operation.kind(),
                    path = operation.path(),
                    retry = operation.retries(),
                    delay_ms = delay.as_millis() as u64,
                    "Session expired during async retry, rescheduling"
                );
                self.counters.retried.fetch_add(1, Ordering::SeqCst);
                let center = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    center.enqueue(operation);
                });
            }
            RetryDecision::Exhausted => {
                warn!(
                    kind = %operation.kind(),
                    path = operation.path(),
                    retries = operation.retries(),
                    "Dropping operation, retry budget exhausted"
                );
                self.finish_dropped(&operation, "policy_exhausted");
            }
        }
    }

    fn finish_dropped(&self, operation: &Operation, reason: &'static str) {
        metrics::counter!(
            "arbor_retry_dropped_total",
            "kind" => operation.kind().as_str(),
            "reason" => reason
        )
        .increment(1);
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
        self.finish();
    }

    fn finish(&self) {
        if self.counters.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}
