//! Mapping discovered source files to build targets
//!
//! Every file found by the source walk is offered to the registered
//! processors. The highest positive bid wins (the first registered processor
//! on a tie). Files no processor wants may still be claimed by the linker,
//! in which case they are collected as pre-built objects. A winning processor
//! that produces an output yields one [`TargetInfo`] keyed by output name.

use crate::error::{HistoryError, HistoryResult};
use crate::processor::{LinkerConfiguration, ProcessorConfiguration, DEFAULT_DISCARD_BID};
use crate::target_info::TargetInfo;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Receives every file found while walking a source tree
pub trait FileVisitor {
    fn visit(&mut self, parent_dir: &Path, file_name: &str) -> HistoryResult<()>;
}

/// Builds the target map for one build invocation
pub struct TargetMatcher {
    processors: Vec<Arc<dyn ProcessorConfiguration>>,
    linker: Option<Arc<dyn LinkerConfiguration>>,
    output_dir: PathBuf,
    targets: BTreeMap<String, TargetInfo>,
    object_files: Vec<PathBuf>,
}

impl TargetMatcher {
    /// Create a matcher placing outputs in `output_dir`
    pub fn new(
        output_dir: impl Into<PathBuf>,
        processors: Vec<Arc<dyn ProcessorConfiguration>>,
        linker: Option<Arc<dyn LinkerConfiguration>>,
    ) -> Self {
        Self {
            processors,
            linker,
            output_dir: output_dir.into(),
            targets: BTreeMap::new(),
            object_files: Vec::new(),
        }
    }

    /// Visit every regular file below `root`
    ///
    /// Symlinks are followed, so a linked source is visited under the link's
    /// path. Dangling links are skipped with a warning.
    pub fn scan(&mut self, root: &Path) -> HistoryResult<()> {
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    if e.loop_ancestor().is_none() && path.is_symlink() && !path.exists() {
                        warn!("Skipping dangling symlink {}", path.display());
                        continue;
                    }
                    let error = match e.into_io_error() {
                        Some(error) => error,
                        None => std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"),
                    };
                    return Err(HistoryError::io(path, error));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let parent = entry.path().parent().unwrap_or(root);
            let file_name = entry.file_name().to_string_lossy();
            self.visit(parent, &file_name)?;
        }
        Ok(())
    }

    /// Targets found so far, keyed by output file name
    pub fn targets(&self) -> &BTreeMap<String, TargetInfo> {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut BTreeMap<String, TargetInfo> {
        &mut self.targets
    }

    /// Files handed straight to the linker
    pub fn object_files(&self) -> &[PathBuf] {
        &self.object_files
    }

    /// Consume the matcher, returning targets and linker inputs
    pub fn into_parts(self) -> (BTreeMap<String, TargetInfo>, Vec<PathBuf>) {
        (self.targets, self.object_files)
    }

    fn select_processor(
        &self,
        file_name: &str,
    ) -> Option<(&Arc<dyn ProcessorConfiguration>, i32)> {
        let mut best: Option<(&Arc<dyn ProcessorConfiguration>, i32)> = None;
        for processor in &self.processors {
            let bid = processor.bid(file_name);
            if bid > best.map_or(0, |(_, best_bid)| best_bid) {
                best = Some((processor, bid));
            }
        }
        best
    }

    fn register(
        &mut self,
        processor: Arc<dyn ProcessorConfiguration>,
        source: PathBuf,
        output_name: String,
    ) -> HistoryResult<()> {
        let output = self.output_dir.join(&output_name);
        if let Some(previous) = self.targets.get(&output_name) {
            let existing = previous.sources().first().cloned().unwrap_or_default();
            if existing != source {
                return Err(HistoryError::conflict(output, existing, source));
            }
            return Ok(());
        }

        let rebuild = processor.rebuild();
        let target = TargetInfo::new(processor, vec![source], vec![], output, rebuild)?;
        self.targets.insert(output_name, target);
        Ok(())
    }
}

impl FileVisitor for TargetMatcher {
    fn visit(&mut self, parent_dir: &Path, file_name: &str) -> HistoryResult<()> {
        let source = parent_dir.join(file_name);

        let selected = self
            .select_processor(file_name)
            .map(|(processor, _)| Arc::clone(processor));
        let Some(processor) = selected else {
            if let Some(linker) = &self.linker {
                let bid = linker.bid(file_name);
                if bid > 0 {
                    if bid == DEFAULT_DISCARD_BID {
                        warn!(
                            "Unrecognized file type {} will be passed to linker",
                            source.display()
                        );
                    }
                    self.object_files.push(source);
                }
            }
            return Ok(());
        };

        match processor.output_file_name(file_name) {
            Some(output_name) => self.register(processor, source, output_name),
            None => {
                debug!(source = %source.display(), "no output for source");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{ExtensionLinker, ExtensionProcessor};
    use std::fs;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn matcher(out: &Path) -> TargetMatcher {
        let compiler: Arc<dyn ProcessorConfiguration> = Arc::new(
            ExtensionProcessor::new("gcc -O2", &["c"], "o").with_header_extensions(&["h"]),
        );
        let assembler: Arc<dyn ProcessorConfiguration> =
            Arc::new(ExtensionProcessor::new("nasm", &["asm"], "o"));
        let linker: Arc<dyn LinkerConfiguration> =
            Arc::new(ExtensionLinker::new(&["o", "lib"]).with_ignored_extensions(&["txt"]));
        TargetMatcher::new(out, vec![compiler, assembler], Some(linker))
    }

    #[test]
    fn test_source_becomes_target() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/src"), "foo.c").unwrap();

        let target = &matcher.targets()["foo.o"];
        assert_eq!(target.sources(), [PathBuf::from("/src/foo.c")]);
        assert_eq!(target.output(), Path::new("/out/foo.o"));
        assert_eq!(target.configuration().identifier(), "gcc -O2");
        assert!(target.rebuild());
    }

    #[test]
    fn test_header_produces_no_target() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/src"), "foo.h").unwrap();
        assert!(matcher.targets().is_empty());
        assert!(matcher.object_files().is_empty());
    }

    #[test]
    fn test_object_file_goes_to_linker() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/prebuilt"), "crt0.o").unwrap();
        matcher.visit(Path::new("/prebuilt"), "notes.txt").unwrap();

        assert!(matcher.targets().is_empty());
        assert_eq!(matcher.object_files(), [PathBuf::from("/prebuilt/crt0.o")]);
    }

    #[traced_test]
    #[test]
    fn test_unrecognized_file_warns() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/prebuilt"), "blob.bin").unwrap();

        assert_eq!(matcher.object_files(), [PathBuf::from("/prebuilt/blob.bin")]);
        assert!(logs_contain("Unrecognized file type"));
    }

    #[test]
    fn test_output_conflict_is_error() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/src"), "foo.c").unwrap();
        let result = matcher.visit(Path::new("/src"), "foo.asm");

        match result {
            Err(HistoryError::OutputConflict {
                output,
                existing,
                incoming,
            }) => {
                assert_eq!(output, PathBuf::from("/out/foo.o"));
                assert_eq!(existing, PathBuf::from("/src/foo.c"));
                assert_eq!(incoming, PathBuf::from("/src/foo.asm"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_same_source_twice_is_not_conflict() {
        let mut matcher = matcher(Path::new("/out"));
        matcher.visit(Path::new("/src"), "foo.c").unwrap();
        matcher.visit(Path::new("/src"), "foo.c").unwrap();
        assert_eq!(matcher.targets().len(), 1);
    }

    #[test]
    fn test_highest_bid_wins_first_on_tie() {
        let generic: Arc<dyn ProcessorConfiguration> =
            Arc::new(ExtensionProcessor::new("generic", &["c"], "obj"));
        let specific: Arc<dyn ProcessorConfiguration> =
            Arc::new(ExtensionProcessor::new("specific", &["c"], "o"));
        let mut matcher = TargetMatcher::new("/out", vec![generic, specific], None);
        matcher.visit(Path::new("/src"), "foo.c").unwrap();

        assert!(matcher.targets().contains_key("foo.obj"));
        assert!(!matcher.targets().contains_key("foo.o"));
    }

    #[test]
    fn test_processor_rebuild_flag_is_propagated() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("foo.o"), "obj").unwrap();
        fs::write(temp_dir.path().join("bar.o"), "obj").unwrap();
        let forced: Arc<dyn ProcessorConfiguration> =
            Arc::new(ExtensionProcessor::new("gcc", &["c"], "o").with_rebuild(true));
        let relaxed: Arc<dyn ProcessorConfiguration> =
            Arc::new(ExtensionProcessor::new("gcc", &["cpp"], "o"));
        let mut matcher = TargetMatcher::new(temp_dir.path(), vec![forced, relaxed], None);
        matcher.visit(Path::new("/src"), "foo.c").unwrap();
        matcher.visit(Path::new("/src"), "bar.cpp").unwrap();

        assert!(matcher.targets()["foo.o"].rebuild());
        assert!(!matcher.targets()["bar.o"].rebuild());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinked_sources() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let shared = temp_dir.path().join("shared");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&shared).unwrap();
        fs::write(src.join("main.c"), "int main;").unwrap();
        fs::write(shared.join("crc.c"), "int crc;").unwrap();
        std::os::unix::fs::symlink(shared.join("crc.c"), src.join("crc.c")).unwrap();

        let mut matcher = matcher(&temp_dir.path().join("out"));
        matcher.scan(&src).unwrap();

        assert_eq!(
            matcher.targets().keys().cloned().collect::<Vec<_>>(),
            vec!["crc.o".to_string(), "main.o".to_string()]
        );
        assert_eq!(matcher.targets()["crc.o"].sources(), [src.join("crc.c")]);
    }

    #[cfg(unix)]
    #[traced_test]
    #[test]
    fn test_scan_skips_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "int main;").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone.c"), src.join("gone.c")).unwrap();

        let mut matcher = matcher(&temp_dir.path().join("out"));
        matcher.scan(&src).unwrap();

        assert_eq!(matcher.targets().len(), 1);
        assert!(matcher.targets().contains_key("main.o"));
        assert!(logs_contain("Skipping dangling symlink"));
    }

    #[test]
    fn test_scan_walks_tree() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join("main.c"), "int main;").unwrap();
        fs::write(src.join("lib/util.c"), "int util;").unwrap();
        fs::write(src.join("lib/util.h"), "int util;").unwrap();
        fs::write(src.join("lib/start.o"), "obj").unwrap();

        let mut matcher = matcher(&temp_dir.path().join("out"));
        matcher.scan(&src).unwrap();

        let (targets, objects) = matcher.into_parts();
        assert_eq!(
            targets.keys().cloned().collect::<Vec<_>>(),
            vec!["main.o".to_string(), "util.o".to_string()]
        );
        assert_eq!(targets["util.o"].sources(), [src.join("lib/util.c")]);
        assert_eq!(objects, vec![src.join("lib/start.o")]);
    }
}
