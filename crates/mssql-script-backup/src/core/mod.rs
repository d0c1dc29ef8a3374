//! Core abstractions for dependency-aware script export.
//!
//! - [`object`]: object categories, catalog keys and resolved objects
//! - [`schema`]: table, column and constraint metadata used for DDL rendering
//! - [`value`]: row values and their T-SQL literal form
//! - [`identifier`]: identifier quoting and literal escaping
//! - [`traits`]: the catalog interface the pipelines consume

pub mod identifier;
pub mod object;
pub mod schema;
pub mod traits;
pub mod value;

pub use object::{admits, DatabaseHandle, NameFilter, ObjectCategory, ObjectKey, ScriptableObject};
pub use schema::{CheckConstraint, Column, ForeignKey, Index, Table};
pub use traits::{BatchSink, CatalogConnector, ObjectCatalog};
pub use value::SqlValue;
