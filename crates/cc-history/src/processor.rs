//! Processor configurations as seen by the history tracker
//!
//! The compiler and linker definitions themselves live in the build
//! definition layer. This module only fixes the capability the tracker needs
//! from them: bid on a file name, map a source to its output name and expose a
//! stable identifier that changes whenever the effective command line does.

use std::fmt;

/// Bid for a file whose extension a processor fully recognizes
pub const DEFAULT_PROCESSOR_BID: i32 = 100;

/// Weakest positive bid
///
/// A processor uses it for files it recognizes but produces nothing for
/// (headers). A linker uses it for files of unknown type that it will accept
/// anyway.
pub const DEFAULT_DISCARD_BID: i32 = 1;

/// A compiler/assembler configuration able to turn sources into outputs
pub trait ProcessorConfiguration {
    /// Identity of the effective command line
    fn identifier(&self) -> &str;

    /// How strongly this configuration claims `file_name`; `<= 0` declines
    fn bid(&self, file_name: &str) -> i32;

    /// Output file name produced from `file_name`, `None` when nothing is produced
    fn output_file_name(&self, file_name: &str) -> Option<String>;

    /// Force every target of this configuration to rebuild
    fn rebuild(&self) -> bool {
        false
    }
}

/// A linker configuration, consulted for files no processor claims
pub trait LinkerConfiguration {
    fn bid(&self, file_name: &str) -> i32;
}

fn has_extension(file_name: &str, extensions: &[String]) -> bool {
    let lower = file_name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
}

fn normalize_extensions(extensions: &[&str]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| {
            let ext = ext.to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Extension-driven processor configuration
///
/// Source extensions bid [`DEFAULT_PROCESSOR_BID`] and map to
/// `<stem>.<output extension>`; header extensions bid
/// [`DEFAULT_DISCARD_BID`] and produce no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProcessor {
    identifier: String,
    source_extensions: Vec<String>,
    header_extensions: Vec<String>,
    output_extension: String,
    rebuild: bool,
}

impl ExtensionProcessor {
    /// Create a processor for `source_extensions` producing `output_extension` files
    pub fn new(
        identifier: impl Into<String>,
        source_extensions: &[&str],
        output_extension: impl Into<String>,
    ) -> Self {
        let output_extension: String = output_extension.into();
        Self {
            identifier: identifier.into(),
            source_extensions: normalize_extensions(source_extensions),
            header_extensions: Vec::new(),
            output_extension: output_extension.trim_start_matches('.').to_string(),
            rebuild: false,
        }
    }

    /// Set the header extensions
    pub fn with_header_extensions(mut self, extensions: &[&str]) -> Self {
        self.header_extensions = normalize_extensions(extensions);
        self
    }

    /// Force rebuilding of everything this processor produces
    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }
}

impl ProcessorConfiguration for ExtensionProcessor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn bid(&self, file_name: &str) -> i32 {
        if has_extension(file_name, &self.source_extensions) {
            DEFAULT_PROCESSOR_BID
        } else if has_extension(file_name, &self.header_extensions) {
            DEFAULT_DISCARD_BID
        } else {
            0
        }
    }

    fn output_file_name(&self, file_name: &str) -> Option<String> {
        if self.bid(file_name) != DEFAULT_PROCESSOR_BID {
            return None;
        }
        let base = file_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(file_name);
        let stem = match base.rfind('.') {
            Some(index) if index > 0 => &base[..index],
            _ => base,
        };
        Some(format!("{}.{}", stem, self.output_extension))
    }

    fn rebuild(&self) -> bool {
        self.rebuild
    }
}

impl fmt::Display for ExtensionProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// Extension-driven linker configuration
///
/// Object and library extensions bid [`DEFAULT_PROCESSOR_BID`], ignored
/// extensions decline, anything else is accepted with [`DEFAULT_DISCARD_BID`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionLinker {
    object_extensions: Vec<String>,
    ignored_extensions: Vec<String>,
}

impl ExtensionLinker {
    pub fn new(object_extensions: &[&str]) -> Self {
        Self {
            object_extensions: normalize_extensions(object_extensions),
            ignored_extensions: Vec::new(),
        }
    }

    /// Set extensions the linker refuses outright
    pub fn with_ignored_extensions(mut self, extensions: &[&str]) -> Self {
        self.ignored_extensions = normalize_extensions(extensions);
        self
    }
}

impl LinkerConfiguration for ExtensionLinker {
    fn bid(&self, file_name: &str) -> i32 {
        if has_extension(file_name, &self.object_extensions) {
            DEFAULT_PROCESSOR_BID
        } else if has_extension(file_name, &self.ignored_extensions) {
            0
        } else {
            DEFAULT_DISCARD_BID
        }
    }
}
