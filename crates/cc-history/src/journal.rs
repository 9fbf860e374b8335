//! `history.xml` reading and writing
//!
//! ```xml
//! <history>
//!   <processor signature="gcc -O2">
//!     <target file="foo.o" lastModified="3e8">
//!       <source file="../src/foo.c" lastModified="1f4"/>
//!     </target>
//!   </processor>
//! </history>
//! ```
//!
//! Timestamps are hexadecimal epoch milliseconds. The bootstrap journal is the
//! bare `<history/>` element without a declaration.

use crate::error::{HistoryError, HistoryResult};
use crate::source_history::SourceHistory;
use crate::target_history::TargetHistory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename = "history")]
struct HistoryElement {
    #[serde(rename = "processor", default)]
    processors: Vec<ProcessorElement>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ProcessorElement {
    #[serde(rename = "@signature")]
    signature: String,
    #[serde(rename = "target", default)]
    targets: Vec<TargetElement>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TargetElement {
    #[serde(rename = "@file")]
    file: String,
    #[serde(rename = "@lastModified")]
    last_modified: String,
    #[serde(rename = "source", default)]
    sources: Vec<SourceElement>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SourceElement {
    #[serde(rename = "@file")]
    file: String,
    #[serde(rename = "@lastModified")]
    last_modified: String,
}

/// Encode a timestamp as two's-complement lowercase hex
pub fn encode_timestamp(millis: i64) -> String {
    format!("{:x}", millis)
}

/// Decode a hex timestamp written by [`encode_timestamp`]
pub fn decode_timestamp(hex: &str) -> Option<i64> {
    u64::from_str_radix(hex.trim(), 16).ok().map(|value| value as i64)
}

/// Parse journal text into target records, in document order
pub fn parse(path: &Path, content: &str) -> HistoryResult<Vec<TargetHistory>> {
    let document: HistoryElement =
        quick_xml::de::from_str(content).map_err(|e| HistoryError::malformed(path, e))?;

    let mut entries = Vec::new();
    for processor in document.processors {
        for target in processor.targets {
            let output_last_modified = decode(path, &target.last_modified)?;
            let sources = target
                .sources
                .into_iter()
                .map(|source| {
                    decode(path, &source.last_modified)
                        .map(|last_modified| SourceHistory::new(source.file, last_modified))
                })
                .collect::<HistoryResult<Vec<_>>>()?;

            let entry = TargetHistory::new(
                processor.signature.as_str(),
                target.file,
                output_last_modified,
                sources,
            )
            .map_err(|e| HistoryError::malformed(path, e))?;
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Read and parse the journal at `path`
pub fn read(path: &Path) -> HistoryResult<Vec<TargetHistory>> {
    let content = fs::read_to_string(path).map_err(|e| HistoryError::io(path, e))?;
    parse(path, &content)
}

/// Render entries grouped by processor signature, with an XML declaration
pub fn render<'a>(
    entries: impl IntoIterator<Item = &'a TargetHistory>,
) -> HistoryResult<String> {
    let mut grouped: BTreeMap<&str, Vec<&TargetHistory>> = BTreeMap::new();
    for entry in entries {
        grouped
            .entry(entry.processor_configuration())
            .or_default()
            .push(entry);
    }

    let document = HistoryElement {
        processors: grouped
            .into_iter()
            .map(|(signature, mut targets)| {
                targets.sort_by(|a, b| a.output().cmp(b.output()));
                ProcessorElement {
                    signature: signature.to_string(),
                    targets: targets.into_iter().map(target_element).collect(),
                }
            })
            .collect(),
    };

    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    document
        .serialize(serializer)
        .map_err(|e| HistoryError::Serialization(e.to_string()))?;

    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

/// Overwrite the journal at `path` with `entries`
pub fn write<'a>(
    path: &Path,
    entries: impl IntoIterator<Item = &'a TargetHistory>,
) -> HistoryResult<()> {
    let content = render(entries)?;
    fs::write(path, content).map_err(|e| HistoryError::io(path, e))
}

fn target_element(entry: &TargetHistory) -> TargetElement {
    TargetElement {
        file: entry.output().to_string(),
        last_modified: encode_timestamp(entry.output_last_modified()),
        sources: entry
            .sources()
            .iter()
            .map(|source| SourceElement {
                file: source.relative_path().to_string(),
                last_modified: encode_timestamp(source.last_modified()),
            })
            .collect(),
    }
}

fn decode(path: &Path, hex: &str) -> HistoryResult<i64> {
    decode_timestamp(hex)
        .ok_or_else(|| HistoryError::malformed(path, format!("invalid timestamp '{}'", hex)))
}
