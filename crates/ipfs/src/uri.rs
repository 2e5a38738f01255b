//! Helpers for `ipfs://` URIs and gateway URLs

use anyhow::{anyhow, Result};
use cid::Cid;
use std::str::FromStr;

pub const IPFS_URI_PREFIX: &str = "ipfs://";

/// Strip a leading `ipfs://` if present
pub fn strip_ipfs_uri_prefix(cid_or_uri: &str) -> &str {
    cid_or_uri
        .strip_prefix(IPFS_URI_PREFIX)
        .unwrap_or(cid_or_uri)
}

/// Add `ipfs://` if missing, and collapse `ipfs://ipfs/` into `ipfs://`
pub fn ensure_ipfs_uri_prefix(cid_or_uri: &str) -> String {
    let uri = if cid_or_uri.starts_with(IPFS_URI_PREFIX) {
        cid_or_uri.to_string()
    } else {
        format!("{}{}", IPFS_URI_PREFIX, cid_or_uri)
    };

    match uri.strip_prefix("ipfs://ipfs/") {
        Some(rest) => format!("{}{}", IPFS_URI_PREFIX, rest),
        None => uri,
    }
}

/// Browsable gateway URL for an `ipfs://` URI or bare CID path
pub fn make_gateway_url(gateway_url: &str, ipfs_uri: &str) -> String {
    format!(
        "{}/{}",
        gateway_url.trim_end_matches('/'),
        strip_ipfs_uri_prefix(ipfs_uri)
    )
}

/// Root CID of an `ipfs://` URI or CID path (`<cid>/<path>`)
pub fn extract_cid(cid_or_uri: &str) -> Result<Cid> {
    let root = strip_ipfs_uri_prefix(cid_or_uri)
        .split('/')
        .next()
        .unwrap_or_default();
    Cid::from_str(root).map_err(|e| anyhow!("Invalid CID {:?}: {}", root, e))
}
