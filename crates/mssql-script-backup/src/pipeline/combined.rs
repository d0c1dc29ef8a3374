use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::core::{CatalogConnector, NameFilter};
use crate::error::Result;
use crate::output::{OutputRouter, OutputTemplate};
use crate::policy::{DataPolicy, SchemaPolicy};

use super::{DataPipeline, ExportPipeline, ExportSummary, SchemaPipeline};

/// Schema then data export into one output template.
///
/// When both runs land in the same files the data run's `USE` preamble is
/// dropped, since the schema run already wrote one. `combined_output`
/// decides this explicitly; left unset, a template without `{5}` counts as
/// combined.
pub struct CombinedExport {
    connector: Arc<dyn CatalogConnector>,
    schema: SchemaPolicy,
    data: DataPolicy,
    databases: Option<NameFilter>,
    tables: Option<NameFilter>,
    combined_output: Option<bool>,
}

/// Summaries of both runs of a [`CombinedExport`].
#[derive(Debug, Clone, Serialize)]
pub struct CombinedSummary {
    pub schema: ExportSummary,
    pub data: ExportSummary,
}

impl CombinedSummary {
    /// Distinct files written by either run.
    pub fn files(&self) -> BTreeSet<PathBuf> {
        self.schema.files.union(&self.data.files).cloned().collect()
    }
}

impl CombinedExport {
    pub fn new(
        connector: Arc<dyn CatalogConnector>,
        schema: SchemaPolicy,
        data: DataPolicy,
    ) -> Self {
        Self {
            connector,
            schema,
            data,
            databases: None,
            tables: None,
            combined_output: None,
        }
    }

    pub fn with_databases(mut self, filter: Option<NameFilter>) -> Self {
        self.databases = filter;
        self
    }

    pub fn with_tables(mut self, filter: Option<NameFilter>) -> Self {
        self.tables = filter;
        self
    }

    /// Force or disable `USE` suppression instead of inferring it.
    pub fn with_combined_output(mut self, combined: Option<bool>) -> Self {
        self.combined_output = combined;
        self
    }

    /// Whether schema and data share output files for `template`.
    pub fn is_combined(&self, template: &OutputTemplate) -> bool {
        self.combined_output
            .unwrap_or_else(|| !template.has_kind_token())
    }

    fn schema_pipeline(&self) -> SchemaPipeline {
        SchemaPipeline::new(Arc::clone(&self.connector), self.schema.clone())
            .with_databases(self.databases.clone())
            .with_tables(self.tables.clone())
    }

    fn data_pipeline(&self, combined: bool) -> DataPipeline {
        let mut policy = self.data.clone();
        if combined {
            policy.use_database = false;
        }
        DataPipeline::new(Arc::clone(&self.connector), policy)
            .with_databases(self.databases.clone())
            .with_tables(self.tables.clone())
    }

    /// Run both pipelines, stamping every path with `started`.
    pub async fn export(
        &self,
        template: OutputTemplate,
        started: DateTime<Local>,
    ) -> Result<CombinedSummary> {
        let combined = self.is_combined(&template);
        if combined {
            info!("Schema and data share output files; data USE preamble suppressed");
        }

        let mut router = OutputRouter::new(template, started);
        let schema = self.schema_pipeline().export(&mut router).await?;
        let data = self.data_pipeline(combined).export(&mut router).await?;
        Ok(CombinedSummary { schema, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, MemoryDatabase};
    use crate::core::{ObjectCategory, ObjectKey};

    fn export() -> CombinedExport {
        let catalog = MemoryCatalog::new("SRV01").with_database(
            MemoryDatabase::new("Sales", 150).with_object(
                ObjectKey::new(ObjectCategory::Table, 1),
                Some("dbo"),
                "Orders",
                &[],
            ),
        );
        CombinedExport::new(
            Arc::new(catalog),
            SchemaPolicy::default(),
            DataPolicy::default(),
        )
    }

    #[test]
    fn test_combined_inferred_from_kind_token() {
        let export = export();
        let shared = OutputTemplate::parse("out/{1}.sql").unwrap();
        let split = OutputTemplate::parse("out/{1}.{5}.sql").unwrap();
        assert!(export.is_combined(&shared));
        assert!(!export.is_combined(&split));
    }

    #[test]
    fn test_explicit_flag_wins() {
        let export = export().with_combined_output(Some(false));
        let shared = OutputTemplate::parse("out/{1}.sql").unwrap();
        assert!(!export.is_combined(&shared));
        assert!(export.data_pipeline(false).policy().use_database);
        assert!(!export.data_pipeline(true).policy().use_database);
    }
}
