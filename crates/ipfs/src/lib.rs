pub mod http;
pub mod memory;
pub mod settings;
pub mod uri;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpIpfs;
pub use memory::MemoryIpfs;
pub use settings::{IpfsSettings, PinningService};

/// Kind of an entry in the IPFS mutable file system
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// One entry of a mutable file system directory listing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub cid: String,
    pub size: u64,
}

impl DirectoryEntry {
    pub fn is_directory_named(&self, name: &str) -> bool {
        self.kind == EntryKind::Directory && self.name == name
    }
}

/// Result of `stat` on a mutable file system path
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DirectoryStat {
    pub cid: String,
    pub kind: EntryKind,
    pub size: u64,
    pub cumulative_size: u64,
    pub blocks: u64,
}

/// Capabilities of an IPFS node used by the uploader
///
/// Paths are mutable file system paths (`/`, `/images`, `/42.json`).
/// CIDs are plain CID strings without the `ipfs://` prefix.
#[async_trait]
pub trait Ipfs: Send + Sync {
    /// List the entries of a directory
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>>;

    /// Stat a file or directory
    async fn stat(&self, path: &str) -> Result<DirectoryStat>;

    /// Write a file, creating it if needed and replacing any previous content
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Read the full content of an object
    async fn cat(&self, cid: &str) -> Result<Vec<u8>>;

    /// Ask the remote pinning service to pin a CID (no-op if already pinned)
    async fn pin(&self, cid: &str) -> Result<()>;

    /// Check whether the remote pinning service already holds a CID
    async fn is_pinned(&self, cid: &str) -> Result<bool>;
}
