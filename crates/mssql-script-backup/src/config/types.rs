//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::NameFilter;
use crate::policy::{DataPolicy, SchemaPolicy};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Server connection.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Output path template, e.g. `out/{1}/{3}/{2}.sql`.
    #[serde(default)]
    pub output: String,

    /// Which pipelines to run (default: all).
    #[serde(default)]
    pub kind: ExportKind,

    /// Databases to export; empty means every user database.
    #[serde(default)]
    pub databases: Vec<String>,

    /// Tables to export within each database; empty means all.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Schema-mode policy.
    #[serde(default)]
    pub schema: SchemaPolicy,

    /// Data-mode policy.
    #[serde(default)]
    pub data: DataPolicy,

    /// Whether schema and data share output files in an `all` run.
    /// Unset means inferred from the template.
    #[serde(default)]
    pub combined_output: Option<bool>,
}

impl BackupConfig {
    pub fn database_filter(&self) -> Option<NameFilter> {
        NameFilter::from_names(self.databases.iter().cloned())
    }

    pub fn table_filter(&self) -> Option<NameFilter> {
        NameFilter::from_names(self.tables.iter().cloned())
    }
}

/// Server connection configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// ADO.NET style connection string.
    #[serde(default)]
    pub connection_string: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("connection_string", &redact_password(&self.connection_string))
            .finish()
    }
}

/// Replace the value of any password key in a connection string.
fn redact_password(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _))
                if matches!(
                    key.trim().to_ascii_lowercase().as_str(),
                    "password" | "pwd"
                ) =>
            {
                format!("{}=[REDACTED]", key)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Pipelines selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Schema, then data.
    #[default]
    All,
    Schema,
    Data,
}

impl ExportKind {
    pub fn includes_data(&self) -> bool {
        matches!(self, ExportKind::All | ExportKind::Data)
    }
}

impl std::str::FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ExportKind::All),
            "schema" => Ok(ExportKind::Schema),
            "data" => Ok(ExportKind::Data),
            other => Err(format!(
                "unknown export type '{}', expected all, schema or data",
                other
            )),
        }
    }
}
