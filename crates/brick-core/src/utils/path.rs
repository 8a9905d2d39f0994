//! Path utilities for safe file system operations.
//!
//! Package names end up as directory names under the vendor directory and the
//! module cache; these helpers keep such joins inside their base directory.

use crate::error::{BrickError, BrickResult};
use std::path::{Component, Path, PathBuf};

/// Check if a path is safe (relative, no directory traversal)
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            // Prefixes and roots are never safe in relative paths
            _ => return false,
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> BrickResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(BrickError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    Ok(base.join(path))
}
