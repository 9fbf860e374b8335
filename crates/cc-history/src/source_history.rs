/// Recorded state of one input file that contributed to a build output
use crate::paths;
use std::path::{Path, PathBuf};

/// A source path (relative to the output directory) and its timestamp at build time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceHistory {
    relative_path: String,
    last_modified: i64,
}

impl SourceHistory {
    /// Create a new source history record
    pub fn new(relative_path: impl Into<String>, last_modified: i64) -> Self {
        Self {
            relative_path: relative_path.into(),
            last_modified,
        }
    }

    /// Path relative to the output directory, possibly containing `..`
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Timestamp recorded when the output was built
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    /// Resolve the recorded path against the current output directory
    pub fn absolute_path(&self, base_dir: &Path) -> PathBuf {
        paths::normalize(&base_dir.join(&self.relative_path))
    }
}
