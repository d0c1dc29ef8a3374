//! Export pipelines using the Template Method pattern.
//!
//! - [`ExportPipeline`]: trait defining the per-run algorithm skeleton
//! - [`SchemaPipeline`]: DDL for every enabled category
//! - [`DataPipeline`]: INSERT batches for tables
//! - [`CombinedExport`]: schema then data into one output template
//!
//! # Architecture
//!
//! A pipeline run connects once, walks the selected databases in server
//! order and emits one [`ScriptOutput`] per database preamble and per
//! scripted object. Consumers either take the raw events through
//! [`ExportPipeline::process`] or route them to files with
//! [`ExportPipeline::export`].

mod combined;
mod data;
mod run;
mod schema;
mod template;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use combined::{CombinedExport, CombinedSummary};
pub use data::DataPipeline;
pub use run::run_backup;
pub use schema::SchemaPipeline;
pub use template::{ExportPipeline, OutputSink, ScriptSink};

/// Batch separator written after every script fragment.
pub const BATCH_SEPARATOR: &str = "GO";

/// Type name of database preamble events.
pub const DATABASE_TYPE_NAME: &str = "Database";

/// Which pipeline produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Schema,
    Data,
}

impl PipelineKind {
    /// Value substituted for the `{5}` template placeholder.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Schema => "schema",
            PipelineKind::Data => "data",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scripted unit handed to the output callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// Script text, each fragment followed by a `GO` line.
    pub text: String,

    pub server: String,
    pub database: String,

    /// Unqualified object name, or the database name for preambles.
    pub name: String,

    /// Object type name, `"Database"` for preambles.
    pub type_name: String,
}

/// Counters for one `process` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Databases visited.
    pub databases: usize,

    /// Objects that produced at least one event.
    pub objects: usize,

    /// All events emitted.
    pub events: usize,
}

/// Result of routing one pipeline run to files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub kind: PipelineKind,
    pub stats: ProcessStats,

    /// Distinct files appended to, sorted.
    pub files: BTreeSet<PathBuf>,
}

impl ExportSummary {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} object(s) from {} database(s) written to {} file(s)",
            self.kind,
            self.stats.objects,
            self.stats.databases,
            self.files.len()
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Join script fragments, appending a `GO` line after each.
pub fn script_text<S: AsRef<str>>(fragments: &[S]) -> String {
    let mut text = String::new();
    for fragment in fragments {
        text.push_str(fragment.as_ref());
        text.push('\n');
        text.push_str(BATCH_SEPARATOR);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_text_separates_fragments() {
        let text = script_text(&["SET ANSI_NULLS ON", "CREATE TABLE [dbo].[T] ([Id] int)"]);
        assert_eq!(
            text,
            "SET ANSI_NULLS ON\nGO\nCREATE TABLE [dbo].[T] ([Id] int)\nGO\n"
        );
        assert_eq!(script_text::<&str>(&[]), "");
    }

    #[test]
    fn test_summary_json() {
        let summary = ExportSummary {
            kind: PipelineKind::Data,
            stats: ProcessStats {
                databases: 1,
                objects: 2,
                events: 3,
            },
            files: BTreeSet::from([PathBuf::from("out/Sales.sql")]),
        };
        assert_eq!(
            summary.summary(),
            "data: 2 object(s) from 1 database(s) written to 1 file(s)"
        );
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"kind\": \"data\""));
    }
}
