//! Incremental build history for C/C++ build tasks
//!
//! Decides which outputs of a build are stale, using a journal
//! (`history.xml`) kept in the output directory:
//! - Matching discovered sources to processors by bidding ([`TargetMatcher`])
//! - Flagging targets whose recorded recipe no longer matches ([`TargetHistoryTable`])
//! - Recording rebuilt outputs and committing the journal
//! - Periodic checkpoints during long builds ([`ProgressMonitor`])
//!
//! # Example
//!
//! ```no_run
//! use cc_history::{ExtensionProcessor, ProcessorConfiguration, TargetHistoryTable, TargetMatcher};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let out = Path::new("build/out");
//! let gcc: Arc<dyn ProcessorConfiguration> =
//!     Arc::new(ExtensionProcessor::new("gcc -O2", &["c"], "o"));
//!
//! let mut history = TargetHistoryTable::new(out).unwrap();
//! let mut matcher = TargetMatcher::new(out, vec![gcc], None);
//! matcher.scan(Path::new("src")).unwrap();
//!
//! let (mut targets, _objects) = matcher.into_parts();
//! history.mark_all_for_rebuild(targets.values_mut());
//! for target in targets.values().filter(|t| t.rebuild()) {
//!     // run the compiler, then:
//!     history.update_target(target);
//! }
//! history.commit().unwrap();
//! ```

pub mod config;
pub mod dependency;
pub mod error;
pub mod history_table;
pub mod journal;
pub mod matcher;
pub mod monitor;
pub mod mtime;
pub mod paths;
pub mod processor;
pub mod source_history;
pub mod target_history;
pub mod target_info;

// Re-export main types
pub use config::{
    HistoryConfig, DEFAULT_CHECKPOINT_INTERVAL_MS, DEFAULT_TIMESTAMP_TOLERANCE_MS, EMPTY_JOURNAL,
    HISTORY_FILE_NAME,
};
pub use dependency::{DependencyInfo, UNKNOWN_LAST_MODIFIED};
pub use error::{HistoryError, HistoryResult};
pub use history_table::{RebuildReason, TargetHistoryTable};
pub use matcher::{FileVisitor, TargetMatcher};
pub use monitor::ProgressMonitor;
pub use processor::{
    ExtensionLinker, ExtensionProcessor, LinkerConfiguration, ProcessorConfiguration,
    DEFAULT_DISCARD_BID, DEFAULT_PROCESSOR_BID,
};
pub use source_history::SourceHistory;
pub use target_history::TargetHistory;
pub use target_info::TargetInfo;
