//! # mssql-script-backup
//!
//! Dependency-ordered schema and data script export for SQL Server.
//!
//! This library turns the databases of a server into replayable T-SQL
//! scripts with support for:
//!
//! - **Schema export** of tables, views, procedures, functions and
//!   partition functions/schemes
//! - **Data export** as batched INSERT statements
//! - **Dependency ordering** so scripts replay serially against an empty server
//! - **Templated output paths** with server, database, object, type,
//!   timestamp and pipeline-kind placeholders
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::Local;
//! use mssql_script_backup::{
//!     CombinedExport, DataPolicy, MssqlConnector, NameFilter, OutputTemplate, SchemaPolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mssql_script_backup::Result<()> {
//!     let connector = Arc::new(MssqlConnector::trusted("db01"));
//!     let export = CombinedExport::new(connector, SchemaPolicy::default(), DataPolicy::default())
//!         .with_databases(NameFilter::parse_list("Sales,HR"));
//!     let template = OutputTemplate::parse("backup/{1}/{3}/{2}.{5}.sql")?;
//!     let summary = export.export(template, Local::now()).await?;
//!     println!("Wrote {} files", summary.files().len());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod resolve;

// Re-exports for convenient access
pub use catalog::{MemoryCatalog, MemoryDatabase, MssqlCatalog, MssqlConnector};
pub use config::{BackupConfig, ConnectionConfig, ExportKind};
pub use crate::core::{
    CatalogConnector, DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory, ObjectKey,
    ScriptableObject,
};
pub use error::{BackupError, Result};
pub use output::{OutputRouter, OutputTemplate};
pub use pipeline::{
    run_backup, CombinedExport, CombinedSummary, DataPipeline, ExportPipeline, ExportSummary,
    PipelineKind, ProcessStats, SchemaPipeline, ScriptOutput,
};
pub use policy::{CreateDatabaseMode, DataPolicy, SchemaPolicy, TargetVersion};
pub use resolve::{DatabaseSelector, DependencyOrderer, ObjectResolver};
