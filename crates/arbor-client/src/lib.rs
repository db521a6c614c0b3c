//! Arbor Client - fault-tolerant access to a tree-structured coordination service
//!
//! This crate provides:
//! - The [`Provider`] capability surface plus an in-memory implementation
//! - [`DelayRetryPolicy`] backoff schedules and retry budgets
//! - [`Operation`] replayable mutations
//! - Inline ([`SyncRetryStrategy`]) and asynchronous-completion
//!   ([`AsyncRetryStrategy`]) retry strategies
//! - The [`AsyncRetryCenter`] background queue

pub mod center;
pub mod operation;
pub mod policy;
pub mod provider;
pub mod strategy;

pub use arbor_common::{ClientError, Configuration, CreateMode, ErrorKind, OperationKind, Result};
pub use center::{AsyncRetryCenter, CenterStats};
pub use operation::{Mutation, Operation};
pub use policy::{DelayRetryPolicy, RetryBudget, RetryDecision};
pub use provider::{MemoryProvider, Provider};
pub use strategy::{AsyncRetryStrategy, RetryStrategy, SyncRetryStrategy, build_strategy};
