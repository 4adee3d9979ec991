//! Progress events and run totals.
//!
//! The scheduler reports what it discovers and resolves through `BackupEvent`s;
//! the CLI decides how to print them. Totals are kept in atomics so transfers
//! finishing on different tasks can contribute without a lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::transfer::{TransferOrigin, TransferOutcome};

#[derive(Debug, Clone)]
pub enum BackupEvent {
    RepositoryDiscovered {
        subject: String,
        repository: String,
    },
    PackageDiscovered {
        subject: String,
        repository: String,
        package: String,
    },
    FileDiscovered {
        subject: String,
        repository: String,
        package: String,
        path: String,
    },
    /// A pre-existing local file failed verification and was deleted.
    StaleCacheDiscarded {
        destination: PathBuf,
        reason: String,
    },
    /// One download-then-verify attempt failed.
    AttemptFailed {
        file: String,
        attempt: u32,
        will_retry: bool,
        error: String,
    },
    FileResolved(TransferOutcome),
}

/// Optional event channel. Emitting never blocks and never fails the run.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<BackupEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<BackupEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: BackupEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching; the run carries on.
            let _ = tx.send(event);
        }
    }
}

/// Running totals. Observability only: no control decision reads them.
#[derive(Debug, Default)]
pub struct RunStats {
    discovered_files: AtomicU64,
    resolved_files: AtomicU64,
    downloaded_files: AtomicU64,
    cache_hits: AtomicU64,
    total_bytes: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_discovered(&self) {
        self.discovered_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved(&self, outcome: &TransferOutcome) {
        self.resolved_files.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(outcome.bytes, Ordering::Relaxed);
        match outcome.origin {
            TransferOrigin::Downloaded => self.downloaded_files.fetch_add(1, Ordering::Relaxed),
            TransferOrigin::LocalCacheHit => self.cache_hits.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn discovered_files(&self) -> u64 {
        self.discovered_files.load(Ordering::Relaxed)
    }

    pub fn resolved_files(&self) -> u64 {
        self.resolved_files.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            file_count: self.resolved_files.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            downloaded: self.downloaded_files.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Final totals of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub file_count: u64,
    pub total_bytes: u64,
    pub downloaded: u64,
    pub cache_hits: u64,
}
