use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PathGateError>;

/// Failures from the path canonicalizer (C1). Kept as its own enum so the
/// canonicalizer's contract stays narrow; the facade folds these into
/// `PathGateError` and, from there, always into a deny.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error("symlink loop or resolution depth exceeded")]
    SymlinkLoop,

    #[error("unresolvable base directory for relative path")]
    UnresolvableBase,

    #[error("permission denied during resolution")]
    PermissionDenied,

    #[error("path resolution failed: {0}")]
    Other(String),
}

/// Top-level crate error.
#[derive(Debug, Error)]
pub enum PathGateError {
    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error("catalog error: duplicate entry (regex {regex:?}, level {level:?})")]
    DuplicateEntry { regex: String, level: String },

    #[error("catalog error: invalid regex {pattern:?}: {reason}")]
    BadPattern { pattern: String, reason: String },

    #[error("catalog error: failed to read supplemental catalog {path}: {reason}")]
    CatalogFile { path: PathBuf, reason: String },

    #[error("malformed JSON-RPC request: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
