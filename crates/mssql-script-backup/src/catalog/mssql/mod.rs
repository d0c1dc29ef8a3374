//! SQL Server catalog over Tiberius.
//!
//! One [`MssqlCatalog`] owns a bb8 pool capped at a single connection, so a
//! pipeline run talks to the server over exactly one session. Object
//! inventories are loaded lazily per database into a [`CatalogSnapshot`] and
//! cached for the lifetime of the session; dependency expansion then runs
//! over the snapshot's edges.

mod data;
mod ddl;
mod queries;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::Pool;
use futures::StreamExt;
use tiberius::{Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, error, info, warn};

use crate::core::identifier::{qualify_mssql, quote_mssql};
use crate::core::schema::{
    CheckConstraint, Column, ComputedColumn, DefaultConstraint, ForeignKey, Identity, Index,
    IndexColumn, KeyConstraint, PartitionPlacement, Table,
};
use crate::core::{
    BatchSink, CatalogConnector, DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory,
    ObjectKey, ScriptableObject,
};
use crate::error::{BackupError, Result};
use crate::policy::{DataScriptOptions, ScriptOptions};

use super::snapshot::{CatalogEntry, CatalogSnapshot};

/// Connection acquisition timeout from pool (30 seconds).
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keepalive interval (30 seconds).
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Connection string for a trusted (integrated security) connection.
pub fn trusted_connection_string(server: &str) -> String {
    format!(
        "Server={};Integrated Security=True;Trusted_Connection=True",
        server
    )
}

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: Config,
}

impl TiberiusConnectionManager {
    fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.config.clone();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;

        tcp.set_nodelay(true).ok();

        // Enable TCP keepalives
        let std_tcp = tcp.into_std().map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: format!("Failed to detach socket: {}", e),
        })?;
        let socket = socket2::Socket::from(std_tcp);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on catalog connection: {}", e);
        }

        let std_tcp: std::net::TcpStream = socket.into();
        std_tcp.set_nonblocking(true).ok();
        let tcp = TcpStream::from_std(std_tcp).map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: format!("Failed to convert socket: {}", e),
        })?;

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Opens [`MssqlCatalog`] sessions from an ADO.NET connection string.
#[derive(Debug, Clone)]
pub struct MssqlConnector {
    connection_string: String,
}

impl MssqlConnector {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }

    /// Integrated-security connection to a named server.
    pub fn trusted(server: &str) -> Self {
        Self::new(trusted_connection_string(server))
    }
}

#[async_trait]
impl CatalogConnector for MssqlConnector {
    async fn connect(&self) -> Result<Box<dyn ObjectCatalog>> {
        let catalog = MssqlCatalog::connect(&self.connection_string).await?;
        Ok(Box::new(catalog))
    }
}

/// SQL Server implementation of [`ObjectCatalog`].
pub struct MssqlCatalog {
    pool: Mutex<Option<Pool<TiberiusConnectionManager>>>,
    server: String,
    snapshots: Mutex<HashMap<String, Arc<CatalogSnapshot>>>,
}

impl MssqlCatalog {
    /// Connect using an ADO.NET connection string.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)
            .map_err(|e| BackupError::Config(format!("Invalid connection string: {}", e)))?;
        let addr = config.get_addr();

        let manager = TiberiusConnectionManager::new(config);
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .retry_connection(false)
            .build(manager)
            .await
            .map_err(|e| {
                error!("Creating catalog connection to {} failed: {}", addr, e);
                BackupError::connection(e)
            })?;

        let server = {
            let mut conn = pool.get().await.map_err(|e| {
                error!("Connecting to {} failed: {}", addr, e);
                BackupError::connection(e)
            })?;
            let row = conn
                .simple_query(queries::SERVER_NAME)
                .await
                .map_err(BackupError::connection)?
                .into_row()
                .await
                .map_err(BackupError::connection)?;
            row.and_then(|r| r.get::<&str, _>(0).map(str::to_string))
                .unwrap_or_else(|| addr.clone())
        };

        info!("Connected to SQL Server {} ({})", server, addr);

        Ok(Self {
            pool: Mutex::new(Some(pool)),
            server,
            snapshots: Mutex::new(HashMap::new()),
        })
    }

    async fn pool(&self) -> Result<Pool<TiberiusConnectionManager>> {
        self.pool
            .lock()
            .await
            .clone()
            .ok_or_else(|| BackupError::pool("connection closed", "using catalog session"))
    }

    /// Run a query and collect its first result set.
    async fn query(&self, database: &str, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let pool = self.pool().await?;
        let mut conn = pool
            .get()
            .await
            .map_err(|e| BackupError::pool(e, "getting catalog connection"))?;

        let failed = |e: tiberius::error::Error| {
            error!("Catalog query in {} failed: {}", database, e);
            BackupError::scripting(database, e)
        };
        let stream = conn.query(sql, params).await.map_err(failed)?;
        stream.into_first_result().await.map_err(failed)
    }

    async fn snapshot(&self, db: &DatabaseHandle) -> Result<Arc<CatalogSnapshot>> {
        let mut cache = self.snapshots.lock().await;
        if let Some(snapshot) = cache.get(&db.name) {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(self.load_snapshot(db).await?);
        cache.insert(db.name.clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn load_snapshot(&self, db: &DatabaseHandle) -> Result<CatalogSnapshot> {
        let name = db.name.as_str();
        let quoted = quote_mssql(name)?;
        let sql = |q: &str| queries::in_database(q, &quoted);

        let mut snapshot = CatalogSnapshot::new(name);
        let mut by_object_id: HashMap<i32, ObjectKey> = HashMap::new();

        for row in self.query(name, &sql(queries::OBJECTS), &[]).await? {
            let category = match row.get::<&str, _>(0).unwrap_or_default() {
                "U" => ObjectCategory::Table,
                "V" => ObjectCategory::View,
                "P" => ObjectCategory::StoredProcedure,
                "FN" | "IF" | "TF" => ObjectCategory::UserDefinedFunction,
                _ => continue,
            };
            let key = ObjectKey::new(category, row.get::<i32, _>(1).unwrap_or(0));
            let mut entry = CatalogEntry::new(
                key,
                row.get::<&str, _>(2),
                row.get::<&str, _>(3).unwrap_or_default(),
            );
            entry.is_system = row.get::<bool, _>(4).unwrap_or(false);
            by_object_id.insert(key.id, key);
            snapshot.add_entry(entry);
        }

        for row in self.query(name, &sql(queries::PARTITION_FUNCTIONS), &[]).await? {
            let key = ObjectKey::new(
                ObjectCategory::PartitionFunction,
                row.get::<i32, _>(0).unwrap_or(0),
            );
            snapshot.add_entry(CatalogEntry::new(
                key,
                None,
                row.get::<&str, _>(1).unwrap_or_default(),
            ));
        }

        for row in self.query(name, &sql(queries::PARTITION_SCHEMES), &[]).await? {
            let key = ObjectKey::new(
                ObjectCategory::PartitionScheme,
                row.get::<i32, _>(0).unwrap_or(0),
            );
            snapshot.add_entry(CatalogEntry::new(
                key,
                None,
                row.get::<&str, _>(1).unwrap_or_default(),
            ));
            let function = ObjectKey::new(
                ObjectCategory::PartitionFunction,
                row.get::<i32, _>(2).unwrap_or(0),
            );
            snapshot.add_dependency(key, function);
        }

        let mut edges = 0usize;
        for q in [queries::FOREIGN_KEY_EDGES, queries::EXPRESSION_EDGES] {
            for row in self.query(name, &sql(q), &[]).await? {
                let from = row.get::<i32, _>(0).and_then(|id| by_object_id.get(&id));
                let to = row.get::<i32, _>(1).and_then(|id| by_object_id.get(&id));
                if let (Some(from), Some(to)) = (from, to) {
                    snapshot.add_dependency(*from, *to);
                    edges += 1;
                }
            }
        }

        for row in self
            .query(name, &sql(queries::PARTITION_PLACEMENT_EDGES), &[])
            .await?
        {
            let table = row.get::<i32, _>(0).and_then(|id| by_object_id.get(&id));
            if let (Some(table), Some(scheme)) = (table, row.get::<i32, _>(1)) {
                snapshot.add_dependency(
                    *table,
                    ObjectKey::new(ObjectCategory::PartitionScheme, scheme),
                );
                edges += 1;
            }
        }

        debug!(
            "Loaded catalog of {}: {} objects, {} dependency edges",
            name,
            snapshot.len(),
            edges
        );
        Ok(snapshot)
    }

    async fn load_table(&self, database: &str, object_id: i32) -> Result<Table> {
        let quoted = quote_mssql(database)?;
        let sql = |q: &str| queries::in_database(q, &quoted);

        let rows = self
            .query(database, &sql(queries::TABLE_NAME), &[&object_id])
            .await?;
        let row = rows.first().ok_or_else(|| BackupError::UnknownObject {
            database: database.to_string(),
            key: ObjectKey::new(ObjectCategory::Table, object_id).to_string(),
        })?;
        let mut table = Table {
            schema: row.get::<&str, _>(0).unwrap_or_default().to_string(),
            name: row.get::<&str, _>(1).unwrap_or_default().to_string(),
            ..Table::default()
        };

        let db_name = database.to_string();
        for row in self
            .query(database, &sql(queries::COLUMNS), &[&object_id, &db_name])
            .await?
        {
            let identity = match (row.get::<i64, _>(8), row.get::<i64, _>(9)) {
                (Some(seed), Some(increment)) => Some(Identity { seed, increment }),
                _ => None,
            };
            let computed = row.get::<&str, _>(10).map(|definition| ComputedColumn {
                definition: definition.to_string(),
                is_persisted: row.get::<bool, _>(11).unwrap_or(false),
            });
            let default = match (row.get::<&str, _>(12), row.get::<&str, _>(13)) {
                (Some(name), Some(definition)) => Some(DefaultConstraint {
                    name: name.to_string(),
                    definition: definition.to_string(),
                }),
                _ => None,
            };
            table.columns.push(Column {
                name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
                data_type: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                type_schema: row.get::<&str, _>(2).map(str::to_string),
                base_type: row.get::<&str, _>(3).map(str::to_string),
                max_length: row.get::<i32, _>(4).unwrap_or(0),
                precision: row.get::<i32, _>(5).unwrap_or(0),
                scale: row.get::<i32, _>(6).unwrap_or(0),
                is_nullable: row.get::<bool, _>(7).unwrap_or(true),
                identity,
                computed,
                default,
                collation: row.get::<&str, _>(14).map(str::to_string),
            });
        }

        self.load_indexes(database, object_id, &mut table).await?;
        self.load_foreign_keys(database, object_id, &mut table).await?;

        for row in self
            .query(database, &sql(queries::CHECK_CONSTRAINTS), &[&object_id])
            .await?
        {
            table.check_constraints.push(CheckConstraint {
                name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
                definition: row.get::<&str, _>(1).unwrap_or_default().to_string(),
            });
        }

        let placement = self
            .query(database, &sql(queries::TABLE_PARTITION), &[&object_id])
            .await?;
        table.partition = placement.first().map(|row| PartitionPlacement {
            scheme: row.get::<&str, _>(0).unwrap_or_default().to_string(),
            column: row.get::<&str, _>(1).unwrap_or_default().to_string(),
        });

        debug!(
            "Loaded {} columns, {} indexes, {} foreign keys for {}",
            table.columns.len(),
            table.indexes.len(),
            table.foreign_keys.len(),
            table.full_name()
        );
        Ok(table)
    }

    async fn load_indexes(&self, database: &str, object_id: i32, table: &mut Table) -> Result<()> {
        let sql = queries::in_database(queries::INDEXES, &quote_mssql(database)?);
        let rows = self.query(database, &sql, &[&object_id]).await?;

        // Rows arrive grouped by index_id.
        let mut current: Option<(i32, bool, bool, Index)> = None;
        let mut finished = Vec::new();
        for row in &rows {
            let index_id = row.get::<i32, _>(0).unwrap_or(0);
            if current.as_ref().map(|c| c.0) != Some(index_id) {
                if let Some(done) = current.take() {
                    finished.push(done);
                }
                current = Some((
                    index_id,
                    row.get::<bool, _>(2).unwrap_or(false),
                    row.get::<bool, _>(3).unwrap_or(false),
                    Index {
                        name: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                        columns: Vec::new(),
                        is_unique: row.get::<bool, _>(4).unwrap_or(false),
                        is_clustered: row.get::<bool, _>(5).unwrap_or(false),
                        include_cols: Vec::new(),
                        filter: row.get::<&str, _>(6).map(str::to_string),
                    },
                ));
            }
            if let Some((_, _, _, index)) = current.as_mut() {
                let column = row.get::<&str, _>(7).unwrap_or_default().to_string();
                if row.get::<bool, _>(9).unwrap_or(false) {
                    index.include_cols.push(column);
                } else {
                    index.columns.push(IndexColumn {
                        name: column,
                        descending: row.get::<bool, _>(8).unwrap_or(false),
                    });
                }
            }
        }
        finished.extend(current);

        for (_, is_primary_key, is_unique_constraint, index) in finished {
            if is_primary_key || is_unique_constraint {
                let key = KeyConstraint {
                    name: index.name,
                    columns: index.columns,
                    is_clustered: index.is_clustered,
                };
                if is_primary_key {
                    table.primary_key = Some(key);
                } else {
                    table.unique_constraints.push(key);
                }
            } else {
                table.indexes.push(index);
            }
        }
        Ok(())
    }

    async fn load_foreign_keys(
        &self,
        database: &str,
        object_id: i32,
        table: &mut Table,
    ) -> Result<()> {
        let sql = queries::in_database(queries::FOREIGN_KEYS, &quote_mssql(database)?);
        let rows = self.query(database, &sql, &[&object_id]).await?;

        let mut last_id: Option<i32> = None;
        for row in &rows {
            let fk_id = row.get::<i32, _>(0).unwrap_or(0);
            if last_id != Some(fk_id) {
                table.foreign_keys.push(ForeignKey {
                    name: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                    columns: Vec::new(),
                    ref_schema: row.get::<&str, _>(3).unwrap_or_default().to_string(),
                    ref_table: row.get::<&str, _>(4).unwrap_or_default().to_string(),
                    ref_columns: Vec::new(),
                    on_delete: row.get::<&str, _>(6).unwrap_or_default().to_string(),
                    on_update: row.get::<&str, _>(7).unwrap_or_default().to_string(),
                });
                last_id = Some(fk_id);
            }
            if let Some(fk) = table.foreign_keys.last_mut() {
                fk.columns
                    .push(row.get::<&str, _>(2).unwrap_or_default().to_string());
                fk.ref_columns
                    .push(row.get::<&str, _>(5).unwrap_or_default().to_string());
            }
        }
        Ok(())
    }

    async fn render_module(
        &self,
        object: &ScriptableObject,
        options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        let database = object.database.as_str();
        let sql = queries::in_database(queries::MODULE, &quote_mssql(database)?);
        let rows = self.query(database, &sql, &[&object.key.id]).await?;

        let definition = rows
            .first()
            .and_then(|row| {
                row.get::<&str, _>(0).map(|d| {
                    (
                        d.to_string(),
                        row.get::<bool, _>(1).unwrap_or(true),
                        row.get::<bool, _>(2).unwrap_or(true),
                    )
                })
            })
            .ok_or_else(|| {
                BackupError::scripting(
                    database,
                    format!(
                        "definition of {} is encrypted or unavailable",
                        object.qualified_name()
                    ),
                )
            })?;

        let schema = object.schema.as_deref().unwrap_or("dbo");
        Ok(ddl::module_script(
            object.category(),
            &qualify_mssql(schema, &object.name)?,
            &definition.0,
            definition.1,
            definition.2,
            options,
        ))
    }

    async fn render_partition_function(
        &self,
        object: &ScriptableObject,
        options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        let database = object.database.as_str();
        let quoted = quote_mssql(database)?;
        let rows = self
            .query(
                database,
                &queries::in_database(queries::PARTITION_FUNCTION, &quoted),
                &[&object.key.id],
            )
            .await?;
        let row = rows.first().ok_or_else(|| BackupError::UnknownObject {
            database: database.to_string(),
            key: object.key.to_string(),
        })?;

        let parameter = Column {
            data_type: row.get::<&str, _>(2).unwrap_or_default().to_string(),
            max_length: row.get::<i32, _>(3).unwrap_or(0),
            precision: row.get::<i32, _>(4).unwrap_or(0),
            scale: row.get::<i32, _>(5).unwrap_or(0),
            ..Column::default()
        };
        let name = row.get::<&str, _>(0).unwrap_or_default().to_string();
        let range_right = row.get::<bool, _>(1).unwrap_or(false);

        let boundaries = self
            .query(
                database,
                &queries::in_database(queries::PARTITION_BOUNDARIES, &quoted),
                &[&object.key.id],
            )
            .await?
            .iter()
            .filter_map(|r| r.get::<&str, _>(0).map(str::to_string))
            .collect();

        ddl::create_partition_function(
            &ddl::PartitionFunctionDef {
                name,
                range_right,
                parameter,
                boundaries,
            },
            options,
        )
    }

    async fn render_partition_scheme(
        &self,
        object: &ScriptableObject,
        options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        let database = object.database.as_str();
        let sql = queries::in_database(queries::PARTITION_SCHEME, &quote_mssql(database)?);
        let rows = self.query(database, &sql, &[&object.key.id]).await?;

        let function = rows
            .first()
            .and_then(|r| r.get::<&str, _>(1))
            .ok_or_else(|| BackupError::UnknownObject {
                database: database.to_string(),
                key: object.key.to_string(),
            })?
            .to_string();
        let filegroups: Vec<String> = rows
            .iter()
            .filter_map(|r| r.get::<&str, _>(2).map(str::to_string))
            .collect();

        ddl::create_partition_scheme(&object.name, &function, &filegroups, options)
    }
}

#[async_trait]
impl ObjectCatalog for MssqlCatalog {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn list_databases(&self, exclude_system: bool) -> Result<Vec<DatabaseHandle>> {
        let rows = self.query("master", queries::DATABASES, &[]).await?;
        let databases: Vec<DatabaseHandle> = rows
            .iter()
            .filter(|row| !(exclude_system && row.get::<bool, _>(2).unwrap_or(false)))
            .map(|row| {
                DatabaseHandle::new(
                    row.get::<&str, _>(0).unwrap_or_default(),
                    row.get::<u8, _>(1).unwrap_or(0),
                )
            })
            .collect();
        debug!("Server {} lists {} database(s)", self.server, databases.len());
        Ok(databases)
    }

    async fn list_objects(
        &self,
        db: &DatabaseHandle,
        category: ObjectCategory,
        filter: Option<&NameFilter>,
    ) -> Result<Vec<ScriptableObject>> {
        Ok(self.snapshot(db).await?.list(category, filter))
    }

    async fn lookup(&self, db: &DatabaseHandle, key: ObjectKey) -> Result<ScriptableObject> {
        self.snapshot(db).await?.lookup(key)
    }

    async fn expand_dependency_order(
        &self,
        db: &DatabaseHandle,
        seeds: &[ScriptableObject],
        include_transitive: bool,
    ) -> Result<Vec<ObjectKey>> {
        let keys: Vec<ObjectKey> = seeds.iter().map(|o| o.key).collect();
        self.snapshot(db).await?.expand(&keys, include_transitive)
    }

    async fn render_script(
        &self,
        object: &ScriptableObject,
        options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        match object.category() {
            ObjectCategory::Table => {
                let table = self.load_table(&object.database, object.key.id).await?;
                ddl::create_table(&table, options)
            }
            ObjectCategory::View
            | ObjectCategory::StoredProcedure
            | ObjectCategory::UserDefinedFunction => self.render_module(object, options).await,
            ObjectCategory::PartitionFunction => {
                self.render_partition_function(object, options).await
            }
            ObjectCategory::PartitionScheme => self.render_partition_scheme(object, options).await,
            ObjectCategory::Database => Err(BackupError::scripting(
                &object.database,
                "databases are scripted through render_database",
            )),
        }
    }

    async fn render_database(
        &self,
        db: &DatabaseHandle,
        options: &ScriptOptions,
    ) -> Result<Vec<String>> {
        let db_name = db.name.clone();
        let rows = self
            .query(&db.name, queries::DATABASE_OPTIONS, &[&db_name])
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| BackupError::scripting(&db.name, "database not found"))?;
        ddl::create_database(
            &db.name,
            row.get::<&str, _>(0),
            row.get::<u8, _>(1).unwrap_or(db.compatibility_level),
            options,
        )
    }

    async fn render_data(
        &self,
        table: &ScriptableObject,
        options: &DataScriptOptions,
        on_batch: &mut BatchSink<'_>,
    ) -> Result<usize> {
        let database = table.database.as_str();
        let meta = self.load_table(database, table.key.id).await?;
        let sql = data::select_rows(database, &meta)?;
        let columns: Vec<&Column> = meta.insertable_columns().collect();
        let mut batcher = data::InsertBatcher::new(&meta, options)?;

        let pool = self.pool().await?;
        let mut conn = pool
            .get()
            .await
            .map_err(|e| BackupError::pool(e, "getting catalog connection"))?;
        let failed = |e: tiberius::error::Error| {
            error!("Reading rows of {} in {} failed: {}", meta.full_name(), database, e);
            BackupError::scripting(database, e)
        };

        let mut rows = conn
            .query(sql.as_str(), &[])
            .await
            .map_err(failed)?
            .into_row_stream();
        let mut row_count = 0usize;
        let mut batches = 0usize;
        while let Some(row) = rows.next().await {
            let row = row.map_err(failed)?;
            let values = columns
                .iter()
                .enumerate()
                .map(|(idx, col)| data::convert_row_value(&row, idx, col))
                .collect();
            row_count += 1;
            if let Some(batch) = batcher.push(values) {
                on_batch(batch)?;
                batches += 1;
            }
        }
        if let Some(batch) = batcher.flush() {
            on_batch(batch)?;
            batches += 1;
        }

        debug!(
            "Scripted {} row(s) of {} in {} batch(es)",
            row_count,
            meta.full_name(),
            batches
        );
        Ok(batches)
    }

    async fn disconnect(&self) {
        if self.pool.lock().await.take().is_some() {
            self.snapshots.lock().await.clear();
            info!("Disconnected from {}", self.server);
        }
    }
}
