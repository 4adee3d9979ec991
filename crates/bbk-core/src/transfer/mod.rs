//! Per-file transfer pipeline.
//!
//! Cache check → (hit | stale → delete | missing) → download → verify, with the
//! download-then-verify unit retried under the run's `RetryPolicy`. A
//! `TransferOutcome` is only produced once the file on disk matches the
//! catalog's SHA-1.

mod error;
pub mod layout;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{CatalogClient, Package, RemoteFile, Repository};
use crate::checksum::{self, ChecksumError};
use crate::pool::WorkerPool;
use crate::retry::{self, RetryDecision, RetryPolicy};
use crate::scheduler::{BackupEvent, EventSink};

pub use error::TransferError;

/// Where the verified bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOrigin {
    Downloaded,
    LocalCacheHit,
}

impl fmt::Display for TransferOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOrigin::Downloaded => write!(f, "Downloaded"),
            TransferOrigin::LocalCacheHit => write!(f, "LocalCacheHit"),
        }
    }
}

/// Terminal result for one file. Only built after a checksum match.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub repository: Repository,
    pub package: Package,
    pub file: RemoteFile,
    pub destination: PathBuf,
    pub origin: TransferOrigin,
    pub bytes: u64,
}

/// Everything a transfer needs besides the file itself. Shared by all
/// transfers of a run.
#[derive(Debug, Clone)]
pub struct TransferContext {
    pub client: Arc<CatalogClient>,
    pub subject: String,
    pub download_root: PathBuf,
    pub network: WorkerPool,
    pub checksum: WorkerPool,
    pub network_buffer_bytes: usize,
    pub checksum_buffer_bytes: usize,
    pub retry: RetryPolicy,
    pub events: EventSink,
}

/// State of the destination before any network call.
enum CacheState {
    Missing,
    Valid { bytes: u64 },
    /// Present but unusable: wrong content, or a symlink (never followed).
    Stale { reason: String },
}

fn inspect_cache(path: &Path, buffer_size: usize, expected: &str) -> Result<CacheState, ChecksumError> {
    // symlink_metadata: a link (dangling or not) must never be written through.
    match path.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => Ok(CacheState::Stale {
            reason: format!("{} is a symbolic link", path.display()),
        }),
        Ok(meta) => match checksum::verify_sha1(path, buffer_size, expected) {
            Ok(()) => Ok(CacheState::Valid { bytes: meta.len() }),
            Err(e) if e.is_mismatch() => Ok(CacheState::Stale {
                reason: e.to_string(),
            }),
            Err(e) => Err(e),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CacheState::Missing),
        Err(source) => Err(ChecksumError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl TransferContext {
    fn display_name(&self, repo: &Repository, pkg: &Package, file: &RemoteFile) -> String {
        format!("{}/{}/{}/{}", self.subject, repo.name, pkg.name, file.path)
    }
}

/// Brings one catalog file onto disk, verified.
pub async fn transfer_file(
    ctx: &TransferContext,
    repo: Repository,
    pkg: Package,
    file: RemoteFile,
) -> Result<TransferOutcome, TransferError> {
    let destination = layout::destination_path(
        &ctx.download_root,
        &ctx.subject,
        &repo.name,
        &pkg.name,
        &file.path,
    )?;

    let cache = {
        let path = destination.clone();
        let expected = file.sha1.clone();
        let buffer = ctx.checksum_buffer_bytes;
        ctx.checksum
            .run(move || inspect_cache(&path, buffer, &expected))
            .await??
    };

    match cache {
        CacheState::Valid { bytes } => {
            tracing::debug!(path = %destination.display(), "local cache hit");
            return Ok(TransferOutcome {
                repository: repo,
                package: pkg,
                file,
                destination,
                origin: TransferOrigin::LocalCacheHit,
                bytes,
            });
        }
        CacheState::Stale { reason } => {
            tracing::warn!(
                path = %destination.display(),
                "{}, deleting the file and trying again",
                reason
            );
            ctx.events.emit(BackupEvent::StaleCacheDiscarded {
                destination: destination.clone(),
                reason,
            });
            match tokio::fs::remove_file(&destination).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(TransferError::Io {
                        action: "delete stale file",
                        path: destination,
                        source,
                    })
                }
            }
        }
        CacheState::Missing => {
            if let Some(parent) = destination.parent() {
                // create_dir_all tolerates siblings racing to create the same parent.
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| TransferError::Io {
                        action: "create directory",
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
    }

    let name = ctx.display_name(&repo, &pkg, &file);
    let bytes = retry::run_with_retry(
        &ctx.retry,
        |attempt| fetch_and_verify(ctx, &repo, &file, &destination, attempt),
        |attempt, error, decision| {
            let will_retry = matches!(decision, RetryDecision::RetryAfter(_));
            tracing::warn!(
                file = %name,
                attempt,
                will_retry,
                "problem downloading: {}",
                error
            );
            ctx.events.emit(BackupEvent::AttemptFailed {
                file: name.clone(),
                attempt,
                will_retry,
                error: error.to_string(),
            });
        },
    )
    .await?;

    Ok(TransferOutcome {
        repository: repo,
        package: pkg,
        file,
        destination,
        origin: TransferOrigin::Downloaded,
        bytes,
    })
}

/// The retried unit: download on the network pool, then verify on the checksum pool.
async fn fetch_and_verify(
    ctx: &TransferContext,
    repo: &Repository,
    file: &RemoteFile,
    destination: &Path,
    attempt: u32,
) -> Result<u64, TransferError> {
    tracing::debug!(path = %file.path, attempt, "downloading");

    let bytes = {
        let client = Arc::clone(&ctx.client);
        let subject = ctx.subject.clone();
        let repo = repo.clone();
        let file = file.clone();
        let path = destination.to_path_buf();
        let buffer = ctx.network_buffer_bytes;
        ctx.network
            .run(move || client.download(&subject, &repo, &file, &path, buffer))
            .await??
    };

    {
        let path = destination.to_path_buf();
        let expected = file.sha1.clone();
        let buffer = ctx.checksum_buffer_bytes;
        ctx.checksum
            .run(move || checksum::verify_sha1(&path, buffer, &expected))
            .await??;
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA1: &str = "f572d396fae9206628714fb2ce00f72e94f2258f";

    #[test]
    fn cache_missing_valid_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jar");
        assert!(matches!(
            inspect_cache(&path, 16, HELLO_SHA1).unwrap(),
            CacheState::Missing
        ));

        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello\n")
            .unwrap();
        assert!(matches!(
            inspect_cache(&path, 16, HELLO_SHA1).unwrap(),
            CacheState::Valid { bytes: 6 }
        ));

        std::fs::write(&path, b"partial").unwrap();
        match inspect_cache(&path, 16, HELLO_SHA1).unwrap() {
            CacheState::Stale { reason } => assert!(reason.contains("mismatch"), "{reason}"),
            _ => panic!("expected stale cache"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_stale_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside.jar");
        let path = dir.path().join("a.jar");
        std::os::unix::fs::symlink(&outside, &path).unwrap();

        match inspect_cache(&path, 16, HELLO_SHA1).unwrap() {
            CacheState::Stale { reason } => assert!(reason.contains("symbolic link"), "{reason}"),
            _ => panic!("expected symlink to be treated as stale"),
        }
        assert!(!outside.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_matching_file_is_still_stale() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.jar");
        std::fs::write(&target, b"hello\n").unwrap();
        let path = dir.path().join("a.jar");
        std::os::unix::fs::symlink(&target, &path).unwrap();

        assert!(matches!(
            inspect_cache(&path, 16, HELLO_SHA1).unwrap(),
            CacheState::Stale { .. }
        ));
    }
}
