//! Catalog client error type.

use std::io;

/// Failure of a catalog read or content download. Never retried by the client itself.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Response status was outside 200..=299.
    #[error("{request} request is not successful: {status} {body}")]
    Http {
        request: String,
        status: String,
        body: String,
    },
    /// curl failed before a response was complete (connect, timeout, reset, ...).
    #[error("{request} request failed: {source}")]
    Transport {
        request: String,
        #[source]
        source: curl::Error,
    },
    #[error("{request} returned malformed JSON: {source}")]
    Decode {
        request: String,
        #[source]
        source: serde_json::Error,
    },
    /// Writing the response body to its destination failed.
    #[error("{request} could not write response body: {source}")]
    Write {
        request: String,
        #[source]
        source: io::Error,
    },
    /// Server kept reporting more pages without advancing its end position.
    #[error("{request} pagination stalled: start_pos {start}, end {end}, total {total}")]
    Pagination {
        request: String,
        start: u64,
        end: u64,
        total: u64,
    },
    #[error("cannot build URL from '{base}': {reason}")]
    InvalidUrl { base: String, reason: String },
}
