//! Classify transfer failures into retry policy error kinds.

use crate::catalog::CatalogError;
use crate::checksum::ChecksumError;
use crate::transfer::TransferError;

use super::policy::ErrorKind;

/// Classify a curl error for retry decisions. Every transport failure is retryable.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    ErrorKind::Connection
}

/// Classify a failed download-then-verify attempt.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Catalog(CatalogError::Transport { source, .. }) => {
            classify_curl_error(source)
        }
        TransferError::Catalog(CatalogError::Http { .. }) => ErrorKind::HttpStatus,
        TransferError::Checksum(ChecksumError::Mismatch { .. }) => ErrorKind::Corrupt,
        _ => ErrorKind::Fatal,
    }
}
