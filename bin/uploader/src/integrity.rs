//! Boot-time check of the IPFS mutable file system layout
//!
//! The server only starts when the root directory and its images and
//! animation subdirectories resolve to exactly the configured CIDs.

use ipfs::{DirectoryEntry, DirectoryStat, Ipfs};
use tracing::{debug, info};

const ROOT_PATH: &str = "/";

/// Directory names and CIDs the IPFS tree must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTree {
    pub images_dir: String,
    pub animation_dir: String,
    pub root_cid: String,
    pub images_cid: String,
    pub animation_cid: String,
}

/// Snapshot of a tree that matched its expected CIDs
#[derive(Debug, Clone)]
pub struct VerifiedTree {
    pub root: DirectoryStat,
    pub images: DirectoryEntry,
    pub animation: DirectoryEntry,
}

impl VerifiedTree {
    pub fn log(&self) {
        info!("{} {} | {}", self.root.kind, ROOT_PATH, self.root.cid);
        info!("{} /{} | {}", self.images.kind, self.images.name, self.images.cid);
        info!(
            "{} /{} | {}",
            self.animation.kind, self.animation.name, self.animation.cid
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("fatal /{0} not found")]
    MissingDirectory(String),

    #[error("fatal {path} [{observed}] != [{expected}]")]
    CidMismatch {
        path: String,
        observed: String,
        expected: String,
    },

    #[error("fatal failed to inspect IPFS tree: {0:#}")]
    Ipfs(anyhow::Error),
}

/// Verify the IPFS tree against the expected names and CIDs.
///
/// Checks run in a fixed order: both directories must exist before any CID
/// is compared, then root, images and animation CIDs are compared as strings.
pub async fn verify_tree(
    ipfs: &dyn Ipfs,
    expected: &ExpectedTree,
) -> Result<VerifiedTree, IntegrityError> {
    let entries = ipfs.list(ROOT_PATH).await.map_err(IntegrityError::Ipfs)?;
    debug!("IPFS root has {} entries", entries.len());

    let images = find_directory(&entries, &expected.images_dir)?;
    let animation = find_directory(&entries, &expected.animation_dir)?;

    let root = ipfs.stat(ROOT_PATH).await.map_err(IntegrityError::Ipfs)?;

    check_cid(ROOT_PATH, &root.cid, &expected.root_cid)?;
    check_cid(&format!("/{}", images.name), &images.cid, &expected.images_cid)?;
    check_cid(
        &format!("/{}", animation.name),
        &animation.cid,
        &expected.animation_cid,
    )?;

    Ok(VerifiedTree {
        root,
        images,
        animation,
    })
}

fn find_directory(entries: &[DirectoryEntry], name: &str) -> Result<DirectoryEntry, IntegrityError> {
    entries
        .iter()
        .find(|entry| entry.is_directory_named(name))
        .cloned()
        .ok_or_else(|| IntegrityError::MissingDirectory(name.to_string()))
}

fn check_cid(path: &str, observed: &str, expected: &str) -> Result<(), IntegrityError> {
    if observed != expected {
        return Err(IntegrityError::CidMismatch {
            path: path.to_string(),
            observed: observed.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}
