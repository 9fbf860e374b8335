//! Periodic journal checkpoints during a long build
//!
//! The build driver reports finished compilations to a [`ProgressMonitor`],
//! which records them in the history table and commits the journal at most
//! once per checkpoint interval. Checkpoints are best effort: a failed one is
//! retried on the next report. The final commit at the end of the build
//! belongs to the caller.

use crate::history_table::TargetHistoryTable;
use crate::processor::ProcessorConfiguration;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct ProgressMonitor<'a> {
    history: &'a mut TargetHistoryTable,
    config: Arc<dyn ProcessorConfiguration>,
    interval: Duration,
    last_commit: Instant,
}

impl<'a> ProgressMonitor<'a> {
    /// Create a monitor using the table's checkpoint interval
    pub fn new(
        history: &'a mut TargetHistoryTable,
        config: Arc<dyn ProcessorConfiguration>,
    ) -> Self {
        let interval = history.config().checkpoint_interval();
        Self {
            history,
            config,
            interval,
            last_commit: Instant::now(),
        }
    }

    /// Override the checkpoint interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Restart the checkpoint clock
    pub fn start(&mut self) {
        self.last_commit = Instant::now();
    }

    /// Record `sources` as compiled and checkpoint if the interval has passed
    pub fn progress(&mut self, sources: &[PathBuf]) {
        self.history.update_sources(self.config.as_ref(), sources);
        self.checkpoint(Instant::now());
    }

    /// End of this processor's work; checkpoint if the interval has passed
    pub fn finish(&mut self, normal: bool) {
        debug!(config = self.config.identifier(), normal, "processor finished");
        self.checkpoint(Instant::now());
    }

    /// The history table being updated
    pub fn history(&self) -> &TargetHistoryTable {
        &*self.history
    }

    fn checkpoint(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_commit) <= self.interval {
            return false;
        }
        if let Err(e) = self.history.commit() {
            debug!("Build history checkpoint failed: {}", e);
            return false;
        }
        self.last_commit = now;
        true
    }
}
