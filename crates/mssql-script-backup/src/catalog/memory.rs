//! In-memory catalog for tests and dry runs.
//!
//! A [`MemoryCatalog`] is assembled from [`MemoryDatabase`] values holding a
//! [`CatalogSnapshot`] plus canned script text. It is its own
//! [`CatalogConnector`]: every `connect()` hands out a clone sharing the same
//! call log, so a test can inspect what the pipeline asked for after the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::identifier::quote_mssql;
use crate::core::{
    BatchSink, CatalogConnector, DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory,
    ObjectKey, ScriptableObject,
};
use crate::error::{BackupError, Result};
use crate::policy::{DataScriptOptions, ScriptOptions};

use super::snapshot::{CatalogEntry, CatalogSnapshot};

/// One recorded catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    Connect,
    ListDatabases,
    ListObjects {
        database: String,
        category: ObjectCategory,
    },
    Lookup {
        database: String,
        key: ObjectKey,
    },
    Expand {
        database: String,
        seeds: usize,
    },
    RenderScript {
        database: String,
        name: String,
    },
    RenderDatabase {
        database: String,
    },
    RenderData {
        database: String,
        name: String,
    },
    Disconnect,
}

/// A database of the in-memory catalog.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    handle: DatabaseHandle,
    is_system: bool,
    snapshot: CatalogSnapshot,
    scripts: HashMap<ObjectKey, Vec<String>>,
    rows: HashMap<ObjectKey, Vec<String>>,
    database_script: Option<Vec<String>>,
}

impl MemoryDatabase {
    pub fn new(name: &str, compatibility_level: u8) -> Self {
        Self {
            handle: DatabaseHandle::new(name, compatibility_level),
            is_system: false,
            snapshot: CatalogSnapshot::new(name),
            scripts: HashMap::new(),
            rows: HashMap::new(),
            database_script: None,
        }
    }

    /// Mark as a system database (`master`, `msdb`, ...).
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Add an object with its script fragments.
    pub fn with_object(
        mut self,
        key: ObjectKey,
        schema: Option<&str>,
        name: &str,
        script: &[&str],
    ) -> Self {
        self.snapshot.add_entry(CatalogEntry::new(key, schema, name));
        if !script.is_empty() {
            self.scripts
                .insert(key, script.iter().map(|s| s.to_string()).collect());
        }
        self
    }

    /// Add an object shipped with the server; never listed or exported.
    pub fn with_system_object(mut self, key: ObjectKey, schema: Option<&str>, name: &str) -> Self {
        self.snapshot
            .add_entry(CatalogEntry::new(key, schema, name).system());
        self
    }

    /// Declare that `dependent` references `dependency`.
    pub fn with_dependency(mut self, dependent: ObjectKey, dependency: ObjectKey) -> Self {
        self.snapshot.add_dependency(dependent, dependency);
        self
    }

    /// INSERT batches returned for a table in data mode.
    pub fn with_rows(mut self, table: ObjectKey, batches: &[&str]) -> Self {
        self.rows
            .insert(table, batches.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Full-mode CREATE DATABASE fragments.
    pub fn with_database_script(mut self, script: &[&str]) -> Self {
        self.database_script = Some(script.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// In-memory [`ObjectCatalog`] and [`CatalogConnector`].
///
/// Clones carry their own copy of the catalog contents and share one call
/// log, so configuring a clone never affects the original.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    server: String,
    databases: Vec<MemoryDatabase>,
    failing_renders: HashSet<(String, ObjectKey)>,
    connect_error: Option<String>,
    calls: Arc<Mutex<Vec<CatalogCall>>>,
}

impl MemoryCatalog {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.to_string(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: MemoryDatabase) -> Self {
        self.databases.push(database);
        self
    }

    /// Make `render_script` fail for one object.
    pub fn with_failing_render(mut self, database: &str, key: ObjectKey) -> Self {
        self.failing_renders.insert((database.to_string(), key));
        self
    }

    /// Make every `connect()` fail with a driver diagnostic.
    pub fn with_connect_error(mut self, detail: &str) -> Self {
        self.connect_error = Some(detail.to_string());
        self
    }

    /// Requests made so far, across all sessions.
    pub async fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: CatalogCall) {
        self.calls.lock().await.push(call);
    }

    fn database(&self, name: &str) -> Result<&MemoryDatabase> {
        self.databases
            .iter()
            .find(|d| d.handle.name == name)
            .ok_or_else(|| BackupError::scripting(name, "database not found"))
    }
}

#[async_trait]
impl CatalogConnector for MemoryCatalog {
    async fn connect(&self) -> Result<Box<dyn ObjectCatalog>> {
        self.record(CatalogCall::Connect).await;
        if let Some(detail) = &self.connect_error {
            return Err(BackupError::connection(detail));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ObjectCatalog for MemoryCatalog {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn list_databases(&self, exclude_system: bool) -> Result<Vec<DatabaseHandle>> {
        self.record(CatalogCall::ListDatabases).await;
        Ok(self
            .databases
            .iter()
            .filter(|d| !(exclude_system && d.is_system))
            .map(|d| d.handle.clone())
            .collect())
    }

    async fn list_objects(
        &self,
        db: &DatabaseHandle,
        category: ObjectCategory,
        filter: Option<&NameFilter>,
    ) -> Result<Vec<ScriptableObject>> {
        self.record(CatalogCall::ListObjects {
            database: db.name.clone(),
            category,
        })
        .await;
        Ok(self.database(&db.name)?.snapshot.list(category, filter))
    }

    async fn lookup(&self, db: &DatabaseHandle, key: ObjectKey) -> Result<ScriptableObject> {
        self.record(CatalogCall::Lookup {
            database: db.name.clone(),
            key,
        })
        .await;
        self.database(&db.name)?.snapshot.lookup(key)
    }

    async fn expand_dependency_order(
        &self,
        db: &DatabaseHandle,
        seeds: &[ScriptableObject],
        include_transitive: bool,
    ) -> Result<Vec<ObjectKey>> {
        self.record(CatalogCall::Expand {
            database: db.name.clone(),
            seeds: seeds.len(),
        })
        .await;
        let keys: Vec<ObjectKey> = seeds.iter().map(|o| o.key).collect();
        self.database(&db.name)?
            .snapshot
            .expand(&keys, include_transitive)
    }

    async fn render_script(
        &self,
        object: &ScriptableObject,
        _options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        self.record(CatalogCall::RenderScript {
            database: object.database.clone(),
            name: object.qualified_name(),
        })
        .await;
        let key = (object.database.clone(), object.key);
        if self.failing_renders.contains(&key) {
            return Err(BackupError::scripting(
                &object.database,
                format!("cannot script {}", object.qualified_name()),
            ));
        }
        let db = self.database(&object.database)?;
        Ok(db.scripts.get(&object.key).cloned().unwrap_or_else(|| {
            vec![format!(
                "-- {} {}",
                object.type_name(),
                object.qualified_name()
            )]
        }))
    }

    async fn render_database(
        &self,
        db: &DatabaseHandle,
        _options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        self.record(CatalogCall::RenderDatabase {
            database: db.name.clone(),
        })
        .await;
        match &self.database(&db.name)?.database_script {
            Some(script) => Ok(script.clone()),
            None => Ok(vec![format!("CREATE DATABASE {}", quote_mssql(&db.name)?)]),
        }
    }

    async fn render_data(
        &self,
        table: &ScriptableObject,
        _options: &DataScriptOptions,
        on_batch: &mut BatchSink<'_>,
    ) -> Result<usize> {
        self.record(CatalogCall::RenderData {
            database: table.database.clone(),
            name: table.qualified_name(),
        })
        .await;
        let batches = self
            .database(&table.database)?
            .rows
            .get(&table.key)
            .cloned()
            .unwrap_or_default();
        let count = batches.len();
        for batch in batches {
            on_batch(batch)?;
        }
        Ok(count)
    }

    async fn disconnect(&self) {
        self.record(CatalogCall::Disconnect).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: i32) -> ObjectKey {
        ObjectKey::new(ObjectCategory::Table, id)
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new("SRV01")
            .with_database(MemoryDatabase::new("master", 150).system())
            .with_database(
                MemoryDatabase::new("Sales", 150)
                    .with_object(table(1), Some("dbo"), "Orders", &["CREATE TABLE [dbo].[Orders] ()"])
                    .with_object(table(2), Some("dbo"), "Customers", &[])
                    .with_system_object(table(3), Some("dbo"), "sysdiagrams"),
            )
    }

    #[tokio::test]
    async fn test_list_databases_excludes_system() {
        let catalog = catalog();
        let all = catalog.list_databases(false).await.unwrap();
        assert_eq!(all.len(), 2);
        let user = catalog.list_databases(true).await.unwrap();
        assert_eq!(user, vec![DatabaseHandle::new("Sales", 150)]);
    }

    #[tokio::test]
    async fn test_render_uses_canned_script_or_placeholder() {
        let catalog = catalog();
        let db = DatabaseHandle::new("Sales", 150);
        let tables = catalog
            .list_objects(&db, ObjectCategory::Table, None)
            .await
            .unwrap();
        assert_eq!(tables.len(), 2);

        let options = ScriptOptions::default();
        let orders = catalog.render_script(&tables[0], &options).await.unwrap();
        assert_eq!(orders, vec!["CREATE TABLE [dbo].[Orders] ()"]);
        let customers = catalog.render_script(&tables[1], &options).await.unwrap();
        assert_eq!(customers, vec!["-- Table dbo.Customers"]);
    }

    #[tokio::test]
    async fn test_sessions_share_call_log() {
        let catalog = catalog();
        let session = catalog.connect().await.unwrap();
        session.list_databases(true).await.unwrap();
        session.disconnect().await;

        assert_eq!(
            catalog.calls().await,
            vec![
                CatalogCall::Connect,
                CatalogCall::ListDatabases,
                CatalogCall::Disconnect
            ]
        );
    }

    #[tokio::test]
    async fn test_configuring_a_clone_keeps_call_log_shared() {
        let catalog = catalog();
        let failing = catalog.clone().with_connect_error("Login failed");

        assert!(failing.connect().await.is_err());
        assert!(catalog.connect().await.is_ok());
        assert_eq!(
            catalog.calls().await,
            vec![CatalogCall::Connect, CatalogCall::Connect]
        );
    }

    #[tokio::test]
    async fn test_connect_error() {
        let catalog = catalog().with_connect_error("Login failed");
        let err = catalog.connect().await.err().unwrap();
        assert!(matches!(err, BackupError::Connection { .. }));
    }
}
