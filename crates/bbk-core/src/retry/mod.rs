//! Retry policy for the download-then-verify unit.
//!
//! The transfer pipeline is the only retry boundary in a run. This module
//! classifies its failures (network, HTTP status, corrupt content, local
//! disk) and decides whether another attempt is allowed.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
