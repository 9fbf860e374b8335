//! History tracking configuration
//!
//! The timestamp tolerance and checkpoint interval are compatibility constants
//! carried over from the legacy build tasks. They can be overridden from a
//! `[history]` table in a TOML file:
//!
//! ```toml
//! [history]
//! timestamp_tolerance_ms = 500
//! checkpoint_interval_ms = 120000
//! ```

use crate::error::{HistoryError, HistoryResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Fixed name of the journal inside the output directory
pub const HISTORY_FILE_NAME: &str = "history.xml";

/// Placeholder journal written when none exists yet
pub const EMPTY_JOURNAL: &str = "<history/>";

/// Allowed drift between a recorded output timestamp and the file on disk
pub const DEFAULT_TIMESTAMP_TOLERANCE_MS: i64 = 500;

/// Minimum time between two periodic journal checkpoints
pub const DEFAULT_CHECKPOINT_INTERVAL_MS: u64 = 120_000;

/// Tunables for the target history table and its progress monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum |recorded - actual| output timestamp difference admitted at load
    pub timestamp_tolerance_ms: i64,
    /// Interval between periodic commits during a build
    pub checkpoint_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timestamp_tolerance_ms: DEFAULT_TIMESTAMP_TOLERANCE_MS,
            checkpoint_interval_ms: DEFAULT_CHECKPOINT_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    history: HistoryConfig,
}

impl HistoryConfig {
    /// Set the timestamp tolerance, saturating at `i64::MAX` milliseconds
    pub fn with_timestamp_tolerance(mut self, tolerance: Duration) -> Self {
        self.timestamp_tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Set the checkpoint interval, saturating at `u64::MAX` milliseconds
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Timestamp tolerance as a duration
    pub fn timestamp_tolerance(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.timestamp_tolerance_ms).unwrap_or(0))
    }

    /// Checkpoint interval as a duration
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> HistoryResult<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| HistoryError::InvalidConfig(e.to_string()))?;
        file.history.validate()?;
        Ok(file.history)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> HistoryResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HistoryError::config_read(path, e))?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|e| HistoryError::config_read(path, e))?;
        file.history.validate()?;
        Ok(file.history)
    }

    /// Validate the configuration values
    pub fn validate(&self) -> HistoryResult<()> {
        if self.timestamp_tolerance_ms < 0 {
            return Err(HistoryError::InvalidConfig(format!(
                "timestamp_tolerance_ms cannot be negative (got {})",
                self.timestamp_tolerance_ms
            )));
        }
        Ok(())
    }
}
