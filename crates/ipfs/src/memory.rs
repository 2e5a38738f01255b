//! In-memory IPFS node for tests and dry runs
//!
//! Holds a flat mutable file system root: seeded directories plus written
//! files. Every write is recorded so callers can assert on exact writes.

use crate::{DirectoryEntry, DirectoryStat, EntryKind, Ipfs};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Node {
    root_cid: String,
    entries: BTreeMap<String, DirectoryEntry>,
    files: BTreeMap<String, Vec<u8>>,
    writes: Vec<(String, Vec<u8>)>,
    pinned: HashSet<String>,
    fail_with: Option<String>,
}

/// In-memory implementation of [`Ipfs`]
#[derive(Default)]
pub struct MemoryIpfs {
    node: Mutex<Node>,
}

impl MemoryIpfs {
    pub fn new(root_cid: impl Into<String>) -> Self {
        let ipfs = Self::default();
        ipfs.lock().root_cid = root_cid.into();
        ipfs
    }

    /// Seed a directory directly under the root
    pub fn with_directory(self, name: &str, cid: &str) -> Self {
        self.lock().entries.insert(
            name.to_string(),
            DirectoryEntry {
                name: name.to_string(),
                kind: EntryKind::Directory,
                cid: cid.to_string(),
                size: 0,
            },
        );
        self
    }

    /// Make every subsequent call fail with the given message
    pub fn fail_with(&self, message: &str) {
        self.lock().fail_with = Some(message.to_string());
    }

    /// All writes performed so far, in order
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Current content of a written file
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Node> {
        // A poisoned lock only means a test panicked mid-call
        self.node.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(node: &Node) -> Result<()> {
        match &node.fail_with {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

/// Stand-in CID for written content: stable per content, not a real multihash CID
fn content_id(content: &[u8]) -> String {
    format!("sha256-{}", hex::encode(Sha256::digest(content)))
}

#[async_trait]
impl Ipfs for MemoryIpfs {
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let node = self.lock();
        Self::check_failure(&node)?;
        if path != "/" {
            anyhow::bail!("file does not exist: {}", path);
        }
        Ok(node.entries.values().cloned().collect())
    }

    async fn stat(&self, path: &str) -> Result<DirectoryStat> {
        let node = self.lock();
        Self::check_failure(&node)?;
        if path == "/" {
            return Ok(DirectoryStat {
                cid: node.root_cid.clone(),
                kind: EntryKind::Directory,
                size: 0,
                cumulative_size: node.files.values().map(|c| c.len() as u64).sum(),
                blocks: node.entries.len() as u64,
            });
        }

        let entry = node
            .entries
            .get(path.trim_start_matches('/'))
            .ok_or_else(|| anyhow!("file does not exist: {}", path))?;
        Ok(DirectoryStat {
            cid: entry.cid.clone(),
            kind: entry.kind,
            size: entry.size,
            cumulative_size: entry.size,
            blocks: 0,
        })
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let mut node = self.lock();
        Self::check_failure(&node)?;
        let name = path.trim_start_matches('/').to_string();
        if let Some(existing) = node.entries.get(&name) {
            if existing.kind == EntryKind::Directory {
                anyhow::bail!("cannot write to directory: {}", path);
            }
        }

        node.entries.insert(
            name.clone(),
            DirectoryEntry {
                name,
                kind: EntryKind::File,
                cid: content_id(content),
                size: content.len() as u64,
            },
        );
        node.files.insert(path.to_string(), content.to_vec());
        node.writes.push((path.to_string(), content.to_vec()));
        Ok(())
    }

    async fn cat(&self, cid: &str) -> Result<Vec<u8>> {
        let node = self.lock();
        Self::check_failure(&node)?;
        node.files
            .values()
            .find(|content| content_id(content) == cid)
            .cloned()
            .ok_or_else(|| anyhow!("block not found: {}", cid))
    }

    async fn pin(&self, cid: &str) -> Result<()> {
        let mut node = self.lock();
        Self::check_failure(&node)?;
        node.pinned.insert(cid.to_string());
        Ok(())
    }

    async fn is_pinned(&self, cid: &str) -> Result<bool> {
        let node = self.lock();
        Self::check_failure(&node)?;
        Ok(node.pinned.contains(cid))
    }
}
