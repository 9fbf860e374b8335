//! Include-dependency record of a single source file
//!
//! A [`DependencyInfo`] captures what a dependency scanner found for one
//! source: its own timestamp plus the ordinary and system include files it
//! pulls in. The composite timestamp (newest of the source and its includes)
//! is computed by the scanner and stored with
//! [`DependencyInfo::set_composite_last_modified`]; until then it reads as
//! [`UNKNOWN_LAST_MODIFIED`] whenever includes exist, which callers must treat
//! as out of date.

use crate::error::{HistoryError, HistoryResult};

/// Composite timestamp sentinel meaning "not computed yet"
pub const UNKNOWN_LAST_MODIFIED: i64 = i64::MIN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    include_path_identifier: String,
    source: String,
    source_last_modified: i64,
    includes: Vec<String>,
    sys_includes: Vec<String>,
    composite_last_modified: i64,
}

impl DependencyInfo {
    /// Create a dependency record
    ///
    /// `include_path_identifier` names the include search path the scan was
    /// performed with; a different search path can resolve different files.
    pub fn new(
        include_path_identifier: impl Into<String>,
        source: impl Into<String>,
        source_last_modified: i64,
        includes: Vec<String>,
        sys_includes: Vec<String>,
    ) -> HistoryResult<Self> {
        let include_path_identifier = include_path_identifier.into();
        let source = source.into();
        if include_path_identifier.is_empty() {
            return Err(HistoryError::invalid_argument("include path identifier"));
        }
        if source.is_empty() {
            return Err(HistoryError::invalid_argument("source"));
        }

        let composite_last_modified = if includes.is_empty() {
            source_last_modified
        } else {
            UNKNOWN_LAST_MODIFIED
        };

        Ok(Self {
            include_path_identifier,
            source,
            source_last_modified,
            includes,
            sys_includes,
            composite_last_modified,
        })
    }

    pub fn include_path_identifier(&self) -> &str {
        &self.include_path_identifier
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_last_modified(&self) -> i64 {
        self.source_last_modified
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn sys_includes(&self) -> &[String] {
        &self.sys_includes
    }

    /// Newest timestamp across the source and its includes, or the sentinel
    pub fn composite_last_modified(&self) -> i64 {
        self.composite_last_modified
    }

    /// Whether the composite timestamp has been determined
    pub fn is_composite_known(&self) -> bool {
        self.composite_last_modified != UNKNOWN_LAST_MODIFIED
    }

    /// Store the composite timestamp computed by a dependency scanner
    pub fn set_composite_last_modified(&mut self, last_modified: i64) {
        self.composite_last_modified = last_modified;
    }
}
