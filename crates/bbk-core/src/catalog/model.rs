//! Catalog entities as returned by the Bintray REST API.
//!
//! Only the fields the backup needs are declared; serde ignores the rest
//! (`owner`, `linked`, `size`, ...).

use serde::{Deserialize, Serialize};

/// A named collection of packages under a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
}

/// A named collection of files under a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
}

/// A downloadable artifact. `sha1` is the authoritative digest of its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub sha1: String,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RemoteFile {
    pub fn new(path: impl Into<String>, sha1: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sha1: sha1.into(),
        }
    }
}
