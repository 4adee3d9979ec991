//! SHA-1 verification of files on disk.
//!
//! Bintray publishes a SHA-1 per file, so that is the digest we stream files
//! through. Reads in caller-sized chunks to keep memory use bounded.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Computed digest disagrees with the catalog's digest.
    #[error("SHA1 mismatch on file {}, expected '{expected}' but was '{actual}'", path.display())]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChecksumError {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, ChecksumError::Mismatch { .. })
    }
}

/// Compute SHA-1 of a file and return the digest as lowercase hex.
pub fn sha1_path(path: &Path, buffer_size: usize) -> Result<String, ChecksumError> {
    let io_err = |source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut f = File::open(path).map_err(io_err)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = match f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verify that `path` hashes to `expected_hex`. The expected value is lowered first.
pub fn verify_sha1(path: &Path, buffer_size: usize, expected_hex: &str) -> Result<(), ChecksumError> {
    let actual = sha1_path(path, buffer_size)?;
    let expected = expected_hex.trim().to_ascii_lowercase();
    if actual != expected {
        return Err(ChecksumError::Mismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}
