//! On-disk layout: `{root}/{subject}/{repo}/{package}/{file path}`.
//!
//! The same layout is used to detect local cache hits on later runs.

use std::path::{Component, Path, PathBuf};

use super::TransferError;

/// Builds the destination for a file. Every component coming from the catalog
/// is checked so the result always stays under `root`.
pub fn destination_path(
    root: &Path,
    subject: &str,
    repository: &str,
    package: &str,
    file_path: &str,
) -> Result<PathBuf, TransferError> {
    let mut out = root.to_path_buf();
    for name in [subject, repository, package] {
        push_segment(&mut out, name, name)?;
    }

    let mut pushed = 0usize;
    for segment in file_path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        push_segment(&mut out, segment, file_path)?;
        pushed += 1;
    }
    if pushed == 0 {
        return Err(unsafe_path(file_path));
    }
    Ok(out)
}

fn push_segment(out: &mut PathBuf, segment: &str, whole: &str) -> Result<(), TransferError> {
    if segment.is_empty() || segment.contains('\0') || segment.contains('\\') {
        return Err(unsafe_path(whole));
    }
    // A single segment must be one plain path component ("..", "/", "C:" are not).
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {
            out.push(segment);
            Ok(())
        }
        _ => Err(unsafe_path(whole)),
    }
}

fn unsafe_path(path: &str) -> TransferError {
    TransferError::UnsafePath {
        path: path.to_string(),
    }
}
