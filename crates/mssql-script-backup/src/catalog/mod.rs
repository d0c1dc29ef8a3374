//! Catalog implementations.
//!
//! - [`mssql`]: live SQL Server catalog over Tiberius
//! - [`memory`]: in-memory catalog built from snapshots and canned scripts
//! - [`snapshot`]: per-database object inventory and dependency ordering

pub mod memory;
pub mod mssql;
pub mod snapshot;

pub use memory::{CatalogCall, MemoryCatalog, MemoryDatabase};
pub use mssql::{trusted_connection_string, MssqlCatalog, MssqlConnector};
pub use snapshot::{CatalogEntry, CatalogSnapshot};
