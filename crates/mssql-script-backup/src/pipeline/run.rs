use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::config::{BackupConfig, ExportKind};
use crate::core::CatalogConnector;
use crate::error::Result;
use crate::output::{OutputRouter, OutputTemplate};

use super::{CombinedExport, DataPipeline, ExportPipeline, ExportSummary, SchemaPipeline};

/// Run the pipelines a validated configuration selects.
///
/// Returns one summary per pipeline run, schema first.
pub async fn run_backup(
    config: &BackupConfig,
    connector: Arc<dyn CatalogConnector>,
) -> Result<Vec<ExportSummary>> {
    config.validate()?;
    let template = OutputTemplate::parse(&config.output)?;
    let started = Local::now();
    info!("Starting {:?} export to {}", config.kind, template.as_str());

    let summaries = match config.kind {
        ExportKind::All => {
            let summary = CombinedExport::new(connector, config.schema.clone(), config.data.clone())
                .with_databases(config.database_filter())
                .with_tables(config.table_filter())
                .with_combined_output(config.combined_output)
                .export(template, started)
                .await?;
            vec![summary.schema, summary.data]
        }
        ExportKind::Schema => {
            let mut router = OutputRouter::new(template, started);
            let summary = SchemaPipeline::new(connector, config.schema.clone())
                .with_databases(config.database_filter())
                .with_tables(config.table_filter())
                .export(&mut router)
                .await?;
            vec![summary]
        }
        ExportKind::Data => {
            let mut router = OutputRouter::new(template, started);
            let summary = DataPipeline::new(connector, config.data.clone())
                .with_databases(config.database_filter())
                .with_tables(config.table_filter())
                .export(&mut router)
                .await?;
            vec![summary]
        }
    };

    Ok(summaries)
}
