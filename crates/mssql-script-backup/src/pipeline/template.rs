//! Template Method trait for export pipelines.
//!
//! The [`ExportPipeline`] trait defines the run skeleton shared by the schema
//! and data pipelines. Implementations supply the steps that differ:
//!
//! - which databases are visited ([`ExportPipeline::selector`])
//! - the database preamble ([`ExportPipeline::preamble`])
//! - the ordered objects of a database ([`ExportPipeline::objects`])
//! - the script fragments of one object ([`ExportPipeline::render`])
//!
//! Everything is awaited in sequence: one database, then one object, at a
//! time, each event delivered before the next catalog call. An object may
//! emit several consecutive events (data mode emits one per INSERT batch);
//! they share the object's name and type, so routed output lands in the same
//! file in order.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::{CatalogConnector, DatabaseHandle, ObjectCatalog, ScriptableObject};
use crate::error::Result;
use crate::output::OutputRouter;
use crate::resolve::DatabaseSelector;

use super::{script_text, ExportSummary, PipelineKind, ProcessStats, ScriptOutput, DATABASE_TYPE_NAME};

/// Callback receiving each event of a run.
pub type OutputSink<'a> = dyn FnMut(ScriptOutput) -> Result<()> + Send + 'a;

/// Receives the fragments of one event for the object being rendered.
pub type ScriptSink<'a> = dyn FnMut(Vec<String>) -> Result<()> + Send + 'a;

#[async_trait]
pub trait ExportPipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Opens the server session for a run.
    fn connector(&self) -> &dyn CatalogConnector;

    fn selector(&self) -> &DatabaseSelector;

    /// Database-level fragments emitted before any object of `db`.
    async fn preamble(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<String>>;

    /// Objects of `db` in emission order.
    async fn objects(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<ScriptableObject>>;

    /// Script one object, calling `emit` once per event. Not calling it, or
    /// passing no fragments, means no event.
    async fn render(
        &self,
        catalog: &dyn ObjectCatalog,
        object: &ScriptableObject,
        emit: &mut ScriptSink<'_>,
    ) -> Result<()>;

    /// Emit the preamble and object events of one database.
    async fn process_database(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
        on_output: &mut OutputSink<'_>,
        stats: &mut ProcessStats,
    ) -> Result<()> {
        info!("Scripting {} for database {}", self.kind(), db.name);
        stats.databases += 1;

        let preamble = self.preamble(catalog, db).await?;
        if !preamble.is_empty() {
            on_output(ScriptOutput {
                text: script_text(&preamble),
                server: catalog.server_name().to_string(),
                database: db.name.clone(),
                name: db.name.clone(),
                type_name: DATABASE_TYPE_NAME.to_string(),
            })?;
            stats.events += 1;
        }

        let server = catalog.server_name().to_string();
        for object in self.objects(catalog, db).await? {
            debug!("{}: {}", object.type_name(), object.name);
            let mut emitted = 0usize;
            self.render(catalog, &object, &mut |fragments: Vec<String>| {
                if fragments.is_empty() {
                    return Ok(());
                }
                on_output(ScriptOutput {
                    text: script_text(&fragments),
                    server: server.clone(),
                    database: db.name.clone(),
                    name: object.name.clone(),
                    type_name: object.type_name().to_string(),
                })?;
                emitted += 1;
                Ok(())
            })
            .await?;

            if emitted == 0 {
                debug!("{}: {} has no output", object.type_name(), object.name);
                continue;
            }
            stats.objects += 1;
            stats.events += emitted;
        }
        Ok(())
    }

    /// Run against an already connected catalog.
    async fn process_catalog(
        &self,
        catalog: &dyn ObjectCatalog,
        on_output: &mut OutputSink<'_>,
    ) -> Result<ProcessStats> {
        let mut stats = ProcessStats::default();
        for db in self.selector().resolve(catalog).await? {
            self.process_database(catalog, &db, on_output, &mut stats)
                .await?;
        }
        info!(
            "{} pipeline finished: {} object(s) in {} database(s)",
            self.kind(),
            stats.objects,
            stats.databases
        );
        Ok(stats)
    }

    /// Run the complete pipeline.
    ///
    /// This is the Template Method: connect, process every selected database,
    /// then disconnect. The session is released whether or not the run
    /// succeeded.
    async fn process(&self, on_output: &mut OutputSink<'_>) -> Result<ProcessStats> {
        let catalog = self.connector().connect().await?;
        let result = self.process_catalog(catalog.as_ref(), on_output).await;
        catalog.disconnect().await;
        result
    }

    /// Run the pipeline and append every event to its templated file.
    async fn export(&self, router: &mut OutputRouter) -> Result<ExportSummary> {
        let kind = self.kind();
        let mut files = BTreeSet::new();
        let stats = self
            .process(&mut |output: ScriptOutput| {
                files.insert(router.route(&output, kind)?);
                Ok(())
            })
            .await?;
        Ok(ExportSummary { kind, stats, files })
    }
}
