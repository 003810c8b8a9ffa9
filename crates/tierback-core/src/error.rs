use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TierbackError {
    #[error("config not found: {0} (run 'tierback config init')")]
    ConfigNotFound(PathBuf),

    #[error("invalid backup level '{0}': expected one of 30m, 3h, 6h, 12h, 1d")]
    InvalidLevel(String),

    #[error("invalid timestamp '{0}': expected RFC 3339, e.g. 2026-01-01T09:30:00+09:00")]
    InvalidTimestamp(String),

    #[error("execution ledger at {path} is corrupt: {source}")]
    CorruptLedger {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write execution ledger at {path}: {source}")]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tier directory {path} is not accessible: {source}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    ArtifactMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    ArtifactDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sequence file {path} does not hold a number: {content:?}")]
    CorruptSequence { path: PathBuf, content: String },

    #[error("config is invalid: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("another run holds the lock at {0}")]
    LockHeld(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TierbackError>;
