use std::path::{Path, PathBuf};

/// Subdirectory of the assets directory holding one metadata document per token
pub const METADATA_SUBDIR: &str = "json";

/// Error type for token ID validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenIdError {
    Empty,
    ContainsNullByte,
    ContainsPathSeparator,
}

impl TokenIdError {
    pub fn message(&self) -> &'static str {
        match self {
            TokenIdError::Empty => "Token ID cannot be empty",
            TokenIdError::ContainsNullByte => "Token ID cannot contain null bytes",
            TokenIdError::ContainsPathSeparator => {
                "Token ID cannot contain path separators (/ or \\)"
            }
        }
    }
}

impl std::fmt::Display for TokenIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for TokenIdError {}

/// Validate that a token ID names exactly one file.
///
/// The token ID is otherwise opaque: numeric, hex or anything else is accepted
/// as long as it cannot escape the metadata directory. `.json` is always
/// appended, so `.` and `..` name plain files (`..json`, `...json`).
pub fn validate_token_id(token_id: &str) -> Result<(), TokenIdError> {
    if token_id.is_empty() {
        return Err(TokenIdError::Empty);
    }

    if token_id.contains('\0') {
        return Err(TokenIdError::ContainsNullByte);
    }

    if token_id.contains('/') || token_id.contains('\\') {
        return Err(TokenIdError::ContainsPathSeparator);
    }

    Ok(())
}

/// File name of a token's metadata document, e.g. `42.json`
pub fn metadata_file_name(token_id: &str) -> String {
    format!("{}.json", token_id)
}

/// Local path of a token's metadata document: `<assets_dir>/json/<token_id>.json`
pub fn local_metadata_path(assets_dir: &Path, token_id: &str) -> PathBuf {
    assets_dir
        .join(METADATA_SUBDIR)
        .join(metadata_file_name(token_id))
}

/// Destination of a token's metadata in the IPFS mutable file system: `/<token_id>.json`
pub fn mfs_metadata_path(token_id: &str) -> String {
    format!("/{}", metadata_file_name(token_id))
}
