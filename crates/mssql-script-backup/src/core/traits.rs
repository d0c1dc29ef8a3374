//! Catalog abstractions consumed by the export pipelines.
//!
//! - [`ObjectCatalog`]: enumerates databases and objects, expands dependency
//!   order and renders script text
//! - [`CatalogConnector`]: opens a catalog session against a server
//!
//! The pipelines only ever talk to these traits, so the same resolution and
//! ordering logic runs against a live server or an in-memory catalog.

use async_trait::async_trait;

use crate::error::Result;
use crate::policy::{DataScriptOptions, ScriptOptions};

use super::object::{DatabaseHandle, NameFilter, ObjectCategory, ObjectKey, ScriptableObject};

/// Receives each INSERT batch of a table as soon as it is rendered.
pub type BatchSink<'a> = dyn FnMut(String) -> Result<()> + Send + 'a;

/// Metadata service for one server connection.
#[async_trait]
pub trait ObjectCatalog: Send + Sync {
    /// Server name reported in output events.
    fn server_name(&self) -> &str;

    /// List databases in server enumeration order.
    async fn list_databases(&self, exclude_system: bool) -> Result<Vec<DatabaseHandle>>;

    /// Compatibility level of a database.
    async fn compatibility_level(&self, db: &DatabaseHandle) -> Result<u8> {
        Ok(db.compatibility_level)
    }

    /// List the non-system objects of one category, in catalog order.
    async fn list_objects(
        &self,
        db: &DatabaseHandle,
        category: ObjectCategory,
        filter: Option<&NameFilter>,
    ) -> Result<Vec<ScriptableObject>>;

    /// Resolve a catalog key to an object.
    async fn lookup(&self, db: &DatabaseHandle, key: ObjectKey) -> Result<ScriptableObject>;

    /// Expand seeds into a dependency-ordered sequence of keys.
    ///
    /// With `include_transitive` the result also holds every object the seeds
    /// depend on. Fails on an empty seed set.
    async fn expand_dependency_order(
        &self,
        db: &DatabaseHandle,
        seeds: &[ScriptableObject],
        include_transitive: bool,
    ) -> Result<Vec<ObjectKey>>;

    /// Render one object as script fragments.
    async fn render_script(
        &self,
        object: &ScriptableObject,
        options: &ScriptOptions,
    ) -> Result<Vec<String>>;

    /// Render the CREATE DATABASE statement(s) for a database.
    async fn render_database(
        &self,
        db: &DatabaseHandle,
        options: &ScriptOptions,
    ) -> Result<Vec<String>>;

    /// Render row inserts for a table, handing batches to `on_batch` in row
    /// order. Returns the number of batches.
    async fn render_data(
        &self,
        table: &ScriptableObject,
        options: &DataScriptOptions,
        on_batch: &mut BatchSink<'_>,
    ) -> Result<usize>;

    /// Release the server connection.
    async fn disconnect(&self);
}

/// Opens catalog sessions.
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ObjectCatalog>>;
}
