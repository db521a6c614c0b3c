//! Capability surface of the coordination service
//!
//! The retry layer never talks to the service directly; everything goes
//! through a [`Provider`]. Implementations must be safe to call from many
//! tasks at once: caller tasks use it on the inline path while the retry
//! center replays operations from its own worker.

pub mod memory;

use async_trait::async_trait;

use arbor_common::{CreateMode, Result};

pub use memory::MemoryProvider;

/// Raw, single-attempt access to the tree
///
/// Every call fails with [`arbor_common::ClientError::SessionExpired`] when the
/// underlying session has lapsed, with `NodeExists`/`NoNode`/`NotEmpty` for
/// the usual tree conflicts, and with `Other` for anything else.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Resolve an application key into the real node path
    fn get_real_path(&self, key: &str) -> String;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Child names (not full paths) of `path`
    async fn get_children(&self, path: &str) -> Result<Vec<String>>;

    async fn get_data(&self, path: &str) -> Result<String>;

    async fn create(&self, path: &str, value: &str, mode: CreateMode) -> Result<()>;

    async fn update(&self, path: &str, value: &str) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Re-establish the session after it expired
    async fn reset_connection(&self) -> Result<()> {
        Ok(())
    }
}
