//! Run-wide abort token.
//!
//! The scheduler trips it on the first fatal error; worker pools check it
//! before starting new work and refuse with `TransferError::Cancelled`.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct RunControl {
    aborted: AtomicBool,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Returns true if this call was the one that tripped it.
    pub fn abort(&self) -> bool {
        !self.aborted.swap(true, Ordering::AcqRel)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}
