//! Path helpers shared by the journal and the rebuild check
//!
//! Journal entries store source paths relative to the output directory, and
//! the rebuild check compares them against live source paths. Both sides go
//! through [`normalize`] so that `a/../b` and `b` compare equal without
//! touching the filesystem.

use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and fold `.` and `..` components lexically
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root
                normalized.pop();
            }
            _ => normalized.push(component),
        }
    }
    normalized
}

/// Path of `target` relative to `base`, falling back to the absolute target
///
/// The result may start with `..` when `target` lives outside `base`.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = normalize(base);
    let target = normalize(target);
    pathdiff::diff_paths(&target, &base).unwrap_or(target)
}
