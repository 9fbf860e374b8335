//! Persistent build history and the incremental rebuild decision
//!
//! A [`TargetHistoryTable`] owns the `history.xml` journal of one output
//! directory. On construction it loads the journal and keeps only entries
//! whose output file still exists with (nearly) the recorded timestamp. During
//! a build it answers whether a [`TargetInfo`] is stale, records fresh history
//! for rebuilt outputs and writes the journal back on [`commit`].
//!
//! Losing the journal is always safe: a missing or unreadable journal only
//! makes every target rebuild.
//!
//! [`commit`]: TargetHistoryTable::commit

use crate::config::{HistoryConfig, EMPTY_JOURNAL, HISTORY_FILE_NAME};
use crate::error::{HistoryError, HistoryResult};
use crate::journal;
use crate::mtime;
use crate::paths;
use crate::processor::ProcessorConfiguration;
use crate::source_history::SourceHistory;
use crate::target_history::TargetHistory;
use crate::target_info::TargetInfo;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why a target was flagged during [`TargetHistoryTable::mark_for_rebuild`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// No trusted history for this output and configuration
    NoHistory,
    /// Sources were added or removed
    SourceCountChanged { recorded: usize, current: usize },
    /// A recorded source is not among the current sources
    SourceSetChanged { source: PathBuf },
    /// A source timestamp differs from the recorded one
    SourceModified { source: PathBuf },
}

impl std::fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHistory => write!(f, "no history"),
            Self::SourceCountChanged { recorded, current } => {
                write!(f, "source count changed from {} to {}", recorded, current)
            }
            Self::SourceSetChanged { source } => {
                write!(f, "source {} no longer used", source.display())
            }
            Self::SourceModified { source } => write!(f, "{} modified", source.display()),
        }
    }
}

/// Build history of one output directory
#[derive(Debug)]
pub struct TargetHistoryTable {
    history_file: PathBuf,
    output_dir: PathBuf,
    history_last_modified: i64,
    entries: BTreeMap<String, TargetHistory>,
    config: HistoryConfig,
    dirty: bool,
}

impl TargetHistoryTable {
    /// Open the history of `output_dir` with the default configuration
    pub fn new(output_dir: impl AsRef<Path>) -> HistoryResult<Self> {
        Self::with_config(output_dir, HistoryConfig::default())
    }

    /// Open the history of `output_dir`
    ///
    /// Creates a placeholder journal when none exists; its timestamp marks the
    /// start of tracking. Failing to create it is an error, failing to parse an
    /// existing one is not.
    pub fn with_config(
        output_dir: impl AsRef<Path>,
        config: HistoryConfig,
    ) -> HistoryResult<Self> {
        config.validate()?;
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.is_dir() {
            return Err(HistoryError::OutputDirNotFound(output_dir));
        }

        let history_file = output_dir.join(HISTORY_FILE_NAME);
        if !history_file.exists() {
            fs::write(&history_file, EMPTY_JOURNAL)
                .map_err(|e| HistoryError::io(&history_file, e))?;
        }
        let history_last_modified = mtime::last_modified(&history_file);

        let mut table = Self {
            history_file,
            output_dir,
            history_last_modified,
            entries: BTreeMap::new(),
            config,
            dirty: false,
        };
        table.load();
        Ok(table)
    }

    fn load(&mut self) {
        let entries = match journal::read(&self.history_file) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring build history: {}", e);
                return;
            }
        };

        for entry in entries {
            let output = self.output_dir.join(entry.output());
            if !output.exists() {
                debug!(output = %output.display(), "dropping history of missing output");
                continue;
            }
            let drift = (mtime::last_modified(&output) - entry.output_last_modified()).abs();
            if drift > self.config.timestamp_tolerance_ms {
                debug!(
                    output = %output.display(),
                    drift_ms = drift,
                    "dropping history of output modified outside the build"
                );
                continue;
            }
            self.entries.insert(entry.output().to_string(), entry);
        }
        debug!(
            journal = %self.history_file.display(),
            targets = self.entries.len(),
            "loaded build history"
        );
    }

    /// History of `output_name`, only if it was produced by `config_id`
    pub fn get(&self, config_id: &str, output_name: &str) -> Option<&TargetHistory> {
        self.entries
            .get(output_name)
            .filter(|entry| entry.processor_configuration() == config_id)
    }

    /// Flag `target` for rebuild unless its recorded history proves it current
    ///
    /// Returns the reason when this call flagged the target.
    pub fn mark_for_rebuild(&self, target: &mut TargetInfo) -> Option<RebuildReason> {
        if target.rebuild() {
            return None;
        }
        let reason = self.staleness(target)?;
        debug!(
            output = %target.output().display(),
            reason = %reason,
            "target must be rebuilt"
        );
        target.must_rebuild();
        Some(reason)
    }

    /// Apply [`TargetHistoryTable::mark_for_rebuild`] to every target
    pub fn mark_all_for_rebuild<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a mut TargetInfo>,
    ) {
        for target in targets {
            self.mark_for_rebuild(target);
        }
    }

    fn staleness(&self, target: &TargetInfo) -> Option<RebuildReason> {
        let Some(history) = self.get(target.configuration().identifier(), &target.output_name())
        else {
            return Some(RebuildReason::NoHistory);
        };

        let recorded = history.sources();
        let current = target.sources();
        if recorded.len() != current.len() {
            return Some(RebuildReason::SourceCountChanged {
                recorded: recorded.len(),
                current: current.len(),
            });
        }

        let current_by_path: HashMap<PathBuf, &PathBuf> = current
            .iter()
            .map(|source| (paths::normalize(source), source))
            .collect();

        for source_history in recorded {
            let path = source_history.absolute_path(&self.output_dir);
            match current_by_path.get(&path) {
                Some(source) => {
                    if mtime::last_modified(source) != source_history.last_modified() {
                        return Some(RebuildReason::SourceModified { source: path });
                    }
                }
                None => return Some(RebuildReason::SourceSetChanged { source: path }),
            }
        }
        None
    }

    /// Record that `output_name` was built by `config_id` from `sources`
    ///
    /// Ignored unless the output exists with a timestamp no older than the
    /// journal had when the table was opened.
    pub fn update(&mut self, config_id: &str, output_name: &str, sources: &[PathBuf]) -> bool {
        let output = self.output_dir.join(output_name);
        let Some(output_last_modified) = self.trackable_timestamp(&output) else {
            return false;
        };

        let base = paths::normalize(&self.output_dir);
        let source_histories = sources
            .iter()
            .map(|source| {
                let relative = paths::relative_path(&base, source);
                SourceHistory::new(relative.to_string_lossy(), mtime::last_modified(source))
            })
            .collect();
        self.record(config_id, output_name, output_last_modified, source_histories)
    }

    /// Record the outcome of building `target`
    pub fn update_target(&mut self, target: &TargetInfo) -> bool {
        let output_name = target.output_name();
        let Some(output_last_modified) = self.trackable_timestamp(target.output()) else {
            return false;
        };
        let source_histories = target.source_histories(&self.output_dir);
        self.record(
            target.configuration().identifier(),
            &output_name,
            output_last_modified,
            source_histories,
        )
    }

    /// Record one target per source, named by the processor's output mapping
    ///
    /// Sources without an output name are skipped. Returns how many targets
    /// were recorded.
    pub fn update_sources(
        &mut self,
        config: &dyn ProcessorConfiguration,
        sources: &[PathBuf],
    ) -> usize {
        let mut recorded = 0;
        for source in sources {
            let file_name = source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(output_name) = config.output_file_name(&file_name) {
                if self.update(config.identifier(), &output_name, std::slice::from_ref(source)) {
                    recorded += 1;
                }
            }
        }
        recorded
    }

    fn trackable_timestamp(&self, output: &Path) -> Option<i64> {
        if !output.exists() {
            debug!(output = %output.display(), "not recording history of missing output");
            return None;
        }
        let last_modified = mtime::last_modified(output);
        if last_modified < self.history_last_modified {
            debug!(
                output = %output.display(),
                "not recording history of output older than the journal"
            );
            return None;
        }
        Some(last_modified)
    }

    fn record(
        &mut self,
        config_id: &str,
        output_name: &str,
        output_last_modified: i64,
        sources: Vec<SourceHistory>,
    ) -> bool {
        match TargetHistory::new(config_id, output_name, output_last_modified, sources) {
            Ok(entry) => {
                self.entries.insert(output_name.to_string(), entry);
                self.dirty = true;
                true
            }
            Err(e) => {
                warn!("Not recording history of {}: {}", output_name, e);
                false
            }
        }
    }

    /// Write the journal if anything changed since the last write
    pub fn commit(&mut self) -> HistoryResult<()> {
        if !self.dirty {
            return Ok(());
        }
        journal::write(&self.history_file, self.entries.values())?;
        self.dirty = false;
        info!(
            journal = %self.history_file.display(),
            targets = self.entries.len(),
            "committed build history"
        );
        Ok(())
    }

    /// Path of the journal file
    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Journal timestamp when the table was opened
    pub fn history_last_modified(&self) -> i64 {
        self.history_last_modified
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Whether there are changes not yet committed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All live entries, ordered by output name
    pub fn iter(&self) -> impl Iterator<Item = &TargetHistory> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ExtensionProcessor;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        src: PathBuf,
        out: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let out = temp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&out).unwrap();
        Fixture {
            _temp: temp,
            src,
            out,
        }
    }

    fn touch(path: &Path, millis: i64) {
        fs::write(path, "x").unwrap();
        mtime::set_last_modified(path, millis).unwrap();
    }

    fn gcc() -> Arc<dyn ProcessorConfiguration> {
        Arc::new(ExtensionProcessor::new("gcc -O2", &["c"], "o"))
    }

    #[test]
    fn test_missing_output_dir_is_error() {
        let f = fixture();
        let result = TargetHistoryTable::new(f.out.join("nope"));
        assert!(matches!(result, Err(HistoryError::OutputDirNotFound(_))));
    }

    #[test]
    fn test_bootstrap_creates_placeholder_journal() {
        let f = fixture();
        let table = TargetHistoryTable::new(&f.out).unwrap();

        assert_eq!(fs::read_to_string(f.out.join("history.xml")).unwrap(), "<history/>");
        assert!(table.is_empty());
        assert!(!table.is_dirty());
        assert_eq!(
            table.history_last_modified(),
            mtime::last_modified(table.history_file())
        );
    }

    #[test]
    fn test_corrupt_journal_is_empty_history() {
        let f = fixture();
        fs::write(f.out.join("history.xml"), "<history><processor").unwrap();

        let table = TargetHistoryTable::new(&f.out).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_get_requires_matching_configuration() {
        let f = fixture();
        let source = f.src.join("foo.c");
        touch(&source, 500);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        touch(&f.out.join("foo.o"), table.history_last_modified() + 1000);

        assert!(table.update("gcc -O2", "foo.o", &[source]));
        assert!(table.get("gcc -O2", "foo.o").is_some());
        assert!(table.get("gcc -O3", "foo.o").is_none());
        assert!(table.get("gcc -O2", "bar.o").is_none());
    }

    #[test]
    fn test_commit_is_noop_when_clean() {
        let f = fixture();
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        table.commit().unwrap();
        assert_eq!(fs::read_to_string(table.history_file()).unwrap(), "<history/>");
    }

    #[test]
    fn test_commit_clears_dirty() {
        let f = fixture();
        let source = f.src.join("foo.c");
        touch(&source, 500);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        touch(&f.out.join("foo.o"), table.history_last_modified() + 1000);

        table.update("gcc -O2", "foo.o", &[source]);
        assert!(table.is_dirty());
        table.commit().unwrap();
        assert!(!table.is_dirty());

        let content = fs::read_to_string(table.history_file()).unwrap();
        assert!(content.contains(r#"signature="gcc -O2""#));
        assert!(content.contains(r#"lastModified="1f4""#));
    }

    #[test]
    fn test_update_refuses_output_older_than_journal() {
        let f = fixture();
        let source = f.src.join("foo.c");
        touch(&source, 500);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        touch(&f.out.join("foo.o"), table.history_last_modified() - 10_000);

        assert!(!table.update("gcc -O2", "foo.o", &[source]));
        assert!(table.is_empty());
        assert!(!table.is_dirty());
    }

    #[test]
    fn test_update_refuses_missing_output() {
        let f = fixture();
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        assert!(!table.update("gcc -O2", "foo.o", &[f.src.join("foo.c")]));
    }

    #[test]
    fn test_update_target_records_relative_sources() {
        let f = fixture();
        let source = f.src.join("foo.c");
        touch(&source, 500);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        let output = f.out.join("foo.o");
        touch(&output, table.history_last_modified() + 1000);

        let target = TargetInfo::new(gcc(), vec![source], vec![], output, false).unwrap();
        assert!(table.update_target(&target));

        let entry = table.get("gcc -O2", "foo.o").unwrap();
        assert_eq!(Path::new(entry.sources()[0].relative_path()), Path::new("../src/foo.c"));
        assert_eq!(entry.sources()[0].last_modified(), 500);
    }

    #[test]
    fn test_update_sources_maps_outputs() {
        let f = fixture();
        let foo = f.src.join("foo.c");
        let header = f.src.join("foo.h");
        touch(&foo, 500);
        touch(&header, 600);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        touch(&f.out.join("foo.o"), table.history_last_modified() + 1000);

        let recorded = table.update_sources(gcc().as_ref(), &[foo, header]);
        assert_eq!(recorded, 1);
        assert_eq!(table.len(), 1);
        assert!(table.get("gcc -O2", "foo.o").is_some());
    }

    #[test]
    fn test_mark_for_rebuild_reports_reason() {
        let f = fixture();
        let source = f.src.join("foo.c");
        touch(&source, 500);
        let mut table = TargetHistoryTable::new(&f.out).unwrap();
        let output = f.out.join("foo.o");
        touch(&output, table.history_last_modified() + 1000);
        table.update("gcc -O2", "foo.o", &[source.clone()]);

        let mut current =
            TargetInfo::new(gcc(), vec![source.clone()], vec![], output.clone(), false).unwrap();
        assert_eq!(table.mark_for_rebuild(&mut current), None);
        assert!(!current.rebuild());

        mtime::set_last_modified(&source, 501).unwrap();
        let mut modified =
            TargetInfo::new(gcc(), vec![source.clone()], vec![], output.clone(), false).unwrap();
        assert_eq!(
            table.mark_for_rebuild(&mut modified),
            Some(RebuildReason::SourceModified {
                source: paths::normalize(&source)
            })
        );

        let other = f.src.join("bar.c");
        touch(&other, 500);
        let mut swapped = TargetInfo::new(gcc(), vec![other], vec![], output, false).unwrap();
        assert!(matches!(
            table.mark_for_rebuild(&mut swapped),
            Some(RebuildReason::SourceSetChanged { .. })
        ));
    }

    #[test]
    fn test_mark_for_rebuild_skips_flagged_targets() {
        let f = fixture();
        let table = TargetHistoryTable::new(&f.out).unwrap();
        let mut target =
            TargetInfo::new(gcc(), vec![f.src.join("foo.c")], vec![], f.out.join("foo.o"), false)
                .unwrap();
        assert!(target.rebuild());
        assert_eq!(table.mark_for_rebuild(&mut target), None);
        assert!(target.rebuild());
    }
}
