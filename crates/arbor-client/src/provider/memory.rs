//! In-process tree store
//!
//! A [`Provider`] backed by an ordered map, with the same conflict rules as a
//! ZooKeeper-like service (parents must exist, non-empty nodes cannot be
//! deleted). Faults can be injected to simulate session expiration and
//! transport failures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use arbor_common::{ClientError, CreateMode, Result, path};

use super::Provider;

#[derive(Clone, Debug)]
struct Node {
    value: String,
    mode: CreateMode,
}

#[derive(Default)]
struct FaultPlan {
    /// Calls to let through before faults start
    skip: u32,
    expire: u32,
    fail: u32,
}

/// Hierarchical in-memory store implementing [`Provider`]
pub struct MemoryProvider {
    namespace: String,
    nodes: RwLock<BTreeMap<String, Node>>,
    faults: Mutex<FaultPlan>,
    offline: AtomicBool,
    sequence: AtomicU64,
    calls: AtomicU64,
    resets: AtomicU64,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::with_namespace("")
    }

    /// Keys resolve beneath `namespace`
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            nodes: RwLock::new(BTreeMap::new()),
            faults: Mutex::new(FaultPlan::default()),
            offline: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            calls: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    // ===================== Fault injection =====================

    /// Fail the next `n` calls with SessionExpired
    pub fn expire_next(&self, n: u32) {
        self.expire_after(0, n);
    }

    /// Let `skip` calls through, then fail `n` calls with SessionExpired
    pub fn expire_after(&self, skip: u32, n: u32) {
        let mut faults = self.faults.lock();
        faults.skip = skip;
        faults.expire = n;
        faults.fail = 0;
    }

    /// Fail the next `n` calls with a non-session transport error
    pub fn fail_next(&self, n: u32) {
        let mut faults = self.faults.lock();
        faults.skip = 0;
        faults.expire = 0;
        faults.fail = n;
    }

    /// While offline every call fails with SessionExpired
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    // ===================== Inspection =====================

    /// Number of tree calls received (faulted ones included)
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        path == path::ROOT || self.nodes.read().contains_key(path)
    }

    pub fn value(&self, path: &str) -> Option<String> {
        self.nodes.read().get(path).map(|n| n.value.clone())
    }

    pub fn mode(&self, path: &str) -> Option<CreateMode> {
        self.nodes.read().get(path).map(|n| n.mode)
    }

    /// All stored paths in lexical order
    pub fn paths(&self) -> Vec<String> {
        self.nodes.read().keys().cloned().collect()
    }

    fn check_fault(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::SessionExpired);
        }
        let mut faults = self.faults.lock();
        if faults.skip > 0 {
            faults.skip -= 1;
            return Ok(());
        }
        if faults.expire > 0 {
            faults.expire -= 1;
            return Err(ClientError::SessionExpired);
        }
        if faults.fail > 0 {
            faults.fail -= 1;
            return Err(ClientError::Other(anyhow!("connection reset by peer")));
        }
        Ok(())
    }

    fn children_of(nodes: &BTreeMap<String, Node>, parent: &str) -> Vec<String> {
        let prefix = if parent == path::ROOT {
            path::ROOT.to_string()
        } else {
            format!("{}{}", parent, path::SEPARATOR)
        };
        nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter(|(p, _)| !p[prefix.len()..].contains(path::SEPARATOR))
            .map(|(p, _)| p[prefix.len()..].to_string())
            .collect()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn get_real_path(&self, key: &str) -> String {
        path::real_path(&self.namespace, key)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.check_fault()?;
        path::validate(path)?;
        Ok(self.contains(path))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>> {
        self.check_fault()?;
        path::validate(path)?;
        let nodes = self.nodes.read();
        if path != path::ROOT && !nodes.contains_key(path) {
            return Err(ClientError::NoNode(path.to_string()));
        }
        Ok(Self::children_of(&nodes, path))
    }

    async fn get_data(&self, path: &str) -> Result<String> {
        self.check_fault()?;
        path::validate(path)?;
        self.value(path)
            .ok_or_else(|| ClientError::NoNode(path.to_string()))
    }

    async fn create(&self, path: &str, value: &str, mode: CreateMode) -> Result<()> {
        self.check_fault()?;
        path::validate(path)?;
        let parent = path::parent(path).ok_or_else(|| ClientError::NodeExists(path.to_string()))?;

        let mut nodes = self.nodes.write();
        if parent != path::ROOT && !nodes.contains_key(parent) {
            return Err(ClientError::NoNode(parent.to_string()));
        }
        let target = match mode {
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential => {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                format!("{}{:010}", path, seq)
            }
            CreateMode::Persistent | CreateMode::Ephemeral => path.to_string(),
        };
        if nodes.contains_key(&target) {
            return Err(ClientError::NodeExists(target));
        }
        nodes.insert(
            target,
            Node {
                value: value.to_string(),
                mode,
            },
        );
        Ok(())
    }

    async fn update(&self, path: &str, value: &str) -> Result<()> {
        self.check_fault()?;
        path::validate(path)?;
        match self.nodes.write().get_mut(path) {
            Some(node) => {
                node.value = value.to_string();
                Ok(())
            }
            None => Err(ClientError::NoNode(path.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.check_fault()?;
        path::validate(path)?;
        if path == path::ROOT {
            return Err(ClientError::Other(anyhow!("cannot delete the tree root")));
        }
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(path) {
            return Err(ClientError::NoNode(path.to_string()));
        }
        if !Self::children_of(&nodes, path).is_empty() {
            return Err(ClientError::NotEmpty(path.to_string()));
        }
        nodes.remove(path);
        Ok(())
    }

    async fn reset_connection(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
