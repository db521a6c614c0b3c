//! Replayable tree mutations
//!
//! An [`Operation`] captures everything needed to re-run a mutation later
//! without the caller: the Provider, the resolved path, and the payload.
//! Replay is idempotent; an existing node on create and a missing node on
//! delete both count as success.

use std::fmt;
use std::sync::Arc;

use arbor_common::{CreateMode, OperationKind, Result};

use crate::provider::Provider;
use crate::strategy::tree::{self, RetryLoop};

/// The mutation itself, one variant per kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    CreateCurrent {
        path: String,
        value: String,
        mode: CreateMode,
    },
    Update {
        path: String,
        value: String,
    },
    DeleteCurrent {
        path: String,
    },
    CreateAllNeeded {
        path: String,
        value: String,
        mode: CreateMode,
    },
    DeleteAllChildren {
        path: String,
    },
    DeleteCurrentBranch {
        path: String,
        boundary: String,
    },
}

impl Mutation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Mutation::CreateCurrent { .. } => OperationKind::CreateCurrent,
            Mutation::Update { .. } => OperationKind::Update,
            Mutation::DeleteCurrent { .. } => OperationKind::DeleteCurrent,
            Mutation::CreateAllNeeded { .. } => OperationKind::CreateAllNeeded,
            Mutation::DeleteAllChildren { .. } => OperationKind::DeleteAllChildren,
            Mutation::DeleteCurrentBranch { .. } => OperationKind::DeleteCurrentBranch,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Mutation::CreateCurrent { path, .. }
            | Mutation::Update { path, .. }
            | Mutation::DeleteCurrent { path }
            | Mutation::CreateAllNeeded { path, .. }
            | Mutation::DeleteAllChildren { path }
            | Mutation::DeleteCurrentBranch { path, .. } => path,
        }
    }
}

/// A pending mutation bound to the Provider it targets
#[derive(Clone)]
pub struct Operation {
    provider: Arc<dyn Provider>,
    mutation: Mutation,
    retries: u32,
}

impl Operation {
    pub fn new(provider: Arc<dyn Provider>, mutation: Mutation) -> Self {
        Self {
            provider,
            mutation,
            retries: 0,
        }
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn kind(&self) -> OperationKind {
        self.mutation.kind()
    }

    pub fn path(&self) -> &str {
        self.mutation.path()
    }

    /// Replays that already failed with SessionExpired
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub(crate) fn record_retry(&mut self) {
        self.retries += 1;
    }

    /// Run the mutation once against its Provider
    ///
    /// A session expiration at any step is returned as SessionExpired; the
    /// caller decides whether to schedule another replay.
    pub async fn execute(&self) -> Result<()> {
        let provider = self.provider.as_ref();
        let mut retry = RetryLoop::once(provider, self.kind(), self.path());
        match &self.mutation {
            Mutation::CreateCurrent { path, value, mode } => {
                tree::create_current(&mut retry, path, value, *mode).await
            }
            Mutation::Update { path, value } => tree::update(&mut retry, path, value).await,
            Mutation::DeleteCurrent { path } => tree::delete_current(&mut retry, path).await,
            Mutation::CreateAllNeeded { path, value, mode } => {
                tree::create_all_needed(&mut retry, path, value, *mode).await
            }
            Mutation::DeleteAllChildren { path } => {
                tree::delete_all_children(&mut retry, path).await
            }
            Mutation::DeleteCurrentBranch { path, boundary } => {
                tree::delete_current_branch(&mut retry, path, boundary).await
            }
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("mutation", &self.mutation)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}
