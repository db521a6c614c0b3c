//! Arbor Common - Shared types and utilities
//!
//! This crate provides the foundational types used by the Arbor client:
//! - Error taxonomy with an explicit retry tag
//! - Tree path utilities
//! - Configuration access
//! - Logging bootstrap

pub mod config;
pub mod error;
pub mod logging;
pub mod path;

// Re-exports for convenience
pub use config::Configuration;
pub use error::{ClientError, ErrorKind, Result};

use serde::{Deserialize, Serialize};

/// Node creation modes understood by the coordination service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    #[default]
    Persistent,
    PersistentSequential,
    Ephemeral,
    EphemeralSequential,
}

impl CreateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateMode::Persistent => "persistent",
            CreateMode::PersistentSequential => "persistent_sequential",
            CreateMode::Ephemeral => "ephemeral",
            CreateMode::EphemeralSequential => "ephemeral_sequential",
        }
    }
}

impl std::fmt::Display for CreateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of tree mutation, used in logs, metrics, and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateCurrent,
    Update,
    DeleteCurrent,
    CreateAllNeeded,
    DeleteAllChildren,
    DeleteCurrentBranch,
    /// Read-path calls routed through the retry loop
    Read,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateCurrent => "create_current",
            OperationKind::Update => "update",
            OperationKind::DeleteCurrent => "delete_current",
            OperationKind::CreateAllNeeded => "create_all_needed",
            OperationKind::DeleteAllChildren => "delete_all_children",
            OperationKind::DeleteCurrentBranch => "delete_current_branch",
            OperationKind::Read => "read",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which retry strategy the surrounding system selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single attempt, no retry
    Usual,
    /// Inline retry, caller waits for resolution
    #[default]
    Sync,
    /// Hand terminal session expirations to the background retry center
    Async,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Usual => "usual",
            StrategyKind::Sync => "sync",
            StrategyKind::Async => "async",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usual" => Ok(StrategyKind::Usual),
            "sync" => Ok(StrategyKind::Sync),
            "async" => Ok(StrategyKind::Async),
            _ => Err(format!("Invalid strategy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mode() {
        assert_eq!(CreateMode::default(), CreateMode::Persistent);
        assert_eq!(CreateMode::EphemeralSequential.as_str(), "ephemeral_sequential");
        assert_eq!(CreateMode::Ephemeral.to_string(), "ephemeral");
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::CreateAllNeeded.to_string(), "create_all_needed");
        assert_eq!(OperationKind::DeleteCurrentBranch.as_str(), "delete_current_branch");
    }

    #[test]
    fn test_strategy_kind() {
        assert_eq!(StrategyKind::default(), StrategyKind::Sync);
        assert_eq!("async".parse::<StrategyKind>().unwrap(), StrategyKind::Async);
        assert_eq!(" Usual ".parse::<StrategyKind>().unwrap(), StrategyKind::Usual);
        assert!("eventually".parse::<StrategyKind>().is_err());
    }
}
