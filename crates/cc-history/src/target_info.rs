/// A candidate build step and its rebuild decision
use crate::error::{HistoryError, HistoryResult};
use crate::mtime;
use crate::paths;
use crate::processor::ProcessorConfiguration;
use crate::source_history::SourceHistory;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One output-producing build step discovered for the current build
///
/// The rebuild flag only ever goes from `false` to `true`.
#[derive(Clone)]
pub struct TargetInfo {
    config: Arc<dyn ProcessorConfiguration>,
    sources: Vec<PathBuf>,
    sys_sources: Vec<PathBuf>,
    output: PathBuf,
    rebuild: bool,
}

impl TargetInfo {
    /// Create a target, forcing a rebuild when `output` does not exist
    pub fn new(
        config: Arc<dyn ProcessorConfiguration>,
        sources: Vec<PathBuf>,
        sys_sources: Vec<PathBuf>,
        output: PathBuf,
        rebuild: bool,
    ) -> HistoryResult<Self> {
        if output.as_os_str().is_empty() {
            return Err(HistoryError::invalid_argument("output"));
        }
        let rebuild = rebuild || !output.exists();
        Ok(Self {
            config,
            sources,
            sys_sources,
            output,
            rebuild,
        })
    }

    pub fn configuration(&self) -> &Arc<dyn ProcessorConfiguration> {
        &self.config
    }

    /// Primary sources
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// System sources (for example libraries passed to a linker)
    pub fn sys_sources(&self) -> &[PathBuf] {
        &self.sys_sources
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// File name component of the output path
    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.to_string_lossy().into_owned())
    }

    pub fn rebuild(&self) -> bool {
        self.rebuild
    }

    /// Flag the target for rebuild; there is no way back
    pub fn must_rebuild(&mut self) {
        self.rebuild = true;
    }

    /// System sources followed by primary sources
    ///
    /// The order is part of the contract: link command lines depend on it.
    pub fn all_sources(&self) -> Vec<PathBuf> {
        self.sys_sources
            .iter()
            .chain(self.sources.iter())
            .cloned()
            .collect()
    }

    /// Absolute paths of [`TargetInfo::all_sources`], in the same order
    pub fn all_source_paths(&self) -> Vec<String> {
        self.all_sources()
            .iter()
            .map(|source| paths::normalize(source).to_string_lossy().into_owned())
            .collect()
    }

    /// Journal records for the primary sources, relative to `base_path`
    pub fn source_histories(&self, base_path: &Path) -> Vec<SourceHistory> {
        self.sources
            .iter()
            .map(|source| {
                let relative = paths::relative_path(base_path, source);
                SourceHistory::new(relative.to_string_lossy(), mtime::last_modified(source))
            })
            .collect()
    }
}

impl fmt::Debug for TargetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetInfo")
            .field("config", &self.config.identifier())
            .field("sources", &self.sources)
            .field("sys_sources", &self.sys_sources)
            .field("output", &self.output)
            .field("rebuild", &self.rebuild)
            .finish()
    }
}
