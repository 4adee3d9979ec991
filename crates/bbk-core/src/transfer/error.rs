//! Error type for a single file's transfer.

use std::io;
use std::path::PathBuf;

use crate::catalog::CatalogError;
use crate::checksum::ChecksumError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
    /// Local filesystem failure outside download/verify (mkdir, delete).
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Catalog path would escape the download root.
    #[error("refusing unsafe file path '{path}'")]
    UnsafePath { path: String },
    /// Work refused because the run was aborted.
    #[error("run aborted after a fatal error")]
    Cancelled,
    /// A pool closure panicked or its task was cancelled.
    #[error("{pool} worker failed: {source}")]
    Worker {
        pool: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
