#![allow(dead_code)]

pub mod mock_catalog;

use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of `data`, as the catalog publishes it.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}
