//! Checksum command: compute SHA-1 of a file.

use anyhow::Result;
use bbk_core::checksum;
use std::path::Path;

/// Compute and print SHA-1 of the given file.
pub fn run_checksum(path: &Path, buffer_bytes: usize) -> Result<()> {
    let digest = checksum::sha1_path(path, buffer_bytes)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
