/// Snapshot of the last known-good recipe that produced an output file
use crate::error::{HistoryError, HistoryResult};
use crate::source_history::SourceHistory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHistory {
    config: String,
    output: String,
    output_last_modified: i64,
    sources: Vec<SourceHistory>,
}

impl TargetHistory {
    /// Create a target history record
    ///
    /// `config` is the processor configuration identifier and `output` the
    /// output file name inside the output directory.
    pub fn new(
        config: impl Into<String>,
        output: impl Into<String>,
        output_last_modified: i64,
        sources: Vec<SourceHistory>,
    ) -> HistoryResult<Self> {
        let config = config.into();
        let output = output.into();
        if config.is_empty() {
            return Err(HistoryError::invalid_argument("processor configuration"));
        }
        if output.is_empty() {
            return Err(HistoryError::invalid_argument("output"));
        }
        Ok(Self {
            config,
            output,
            output_last_modified,
            sources,
        })
    }

    /// Processor configuration identifier
    pub fn processor_configuration(&self) -> &str {
        &self.config
    }

    /// Output file name
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn output_last_modified(&self) -> i64 {
        self.output_last_modified
    }

    /// Sources consumed to produce the output
    pub fn sources(&self) -> &[SourceHistory] {
        &self.sources
    }
}
