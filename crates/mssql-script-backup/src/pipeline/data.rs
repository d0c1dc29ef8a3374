use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::identifier::quote_mssql;
use crate::core::{
    CatalogConnector, DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory, ObjectKey,
    ScriptableObject,
};
use crate::error::Result;
use crate::policy::{DataPolicy, DataScriptOptions};
use crate::resolve::{DatabaseSelector, DependencyOrderer, ObjectResolver};

use super::{ExportPipeline, PipelineKind, ScriptSink};

/// Scripts table rows as INSERT batches.
///
/// Each batch is a separate event, delivered as soon as the catalog renders
/// it, so a table never has to fit in memory. Consecutive events of one table
/// share its name and type.
///
/// Only tables carry rows: the expansion may pull in views or functions a
/// table depends on, and those are skipped. With
/// `include_discovered_dependencies` off, tables the expansion adds beyond
/// the resolved set are skipped as well.
pub struct DataPipeline {
    connector: Arc<dyn CatalogConnector>,
    policy: DataPolicy,
    options: DataScriptOptions,
    selector: DatabaseSelector,
    resolver: ObjectResolver,
    orderer: DependencyOrderer,
}

impl DataPipeline {
    pub fn new(connector: Arc<dyn CatalogConnector>, policy: DataPolicy) -> Self {
        Self {
            connector,
            options: policy.script_options(),
            selector: DatabaseSelector::default(),
            resolver: ObjectResolver::new(&[ObjectCategory::Table], None),
            orderer: DependencyOrderer::new(policy.enforce_dependencies)
                .with_discovered(false, &[ObjectCategory::Table]),
            policy,
        }
    }

    pub fn with_databases(mut self, filter: Option<NameFilter>) -> Self {
        self.selector = DatabaseSelector::new(filter);
        self
    }

    pub fn with_tables(mut self, filter: Option<NameFilter>) -> Self {
        self.resolver = ObjectResolver::new(&[ObjectCategory::Table], filter);
        self
    }

    pub fn policy(&self) -> &DataPolicy {
        &self.policy
    }
}

#[async_trait]
impl ExportPipeline for DataPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Data
    }

    fn connector(&self) -> &dyn CatalogConnector {
        self.connector.as_ref()
    }

    fn selector(&self) -> &DatabaseSelector {
        &self.selector
    }

    async fn preamble(
        &self,
        _catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<String>> {
        if self.policy.use_database {
            Ok(vec![format!("Use {}", quote_mssql(&db.name)?)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn objects(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<ScriptableObject>> {
        let seeds = self.resolver.resolve(catalog, db).await?;
        let resolved: HashSet<ObjectKey> = seeds.iter().map(|s| s.key).collect();
        let ordered = self.orderer.order(catalog, db, seeds).await?;

        if self.policy.include_discovered_dependencies {
            return Ok(ordered);
        }
        Ok(ordered
            .into_iter()
            .filter(|o| {
                let keep = resolved.contains(&o.key);
                if !keep {
                    debug!("{}: skipping discovered table {}", db.name, o.qualified_name());
                }
                keep
            })
            .collect())
    }

    async fn render(
        &self,
        catalog: &dyn ObjectCatalog,
        object: &ScriptableObject,
        emit: &mut ScriptSink<'_>,
    ) -> Result<()> {
        if object.category() != ObjectCategory::Table {
            return Ok(());
        }
        let batches = catalog
            .render_data(object, &self.options, &mut |batch: String| emit(vec![batch]))
            .await?;
        debug!("{}: {} batch(es)", object.qualified_name(), batches);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCall, MemoryCatalog, MemoryDatabase};
    use crate::pipeline::ScriptOutput;

    const ORDERS: ObjectKey = ObjectKey {
        category: ObjectCategory::Table,
        id: 1,
    };
    const CUSTOMERS: ObjectKey = ObjectKey {
        category: ObjectCategory::Table,
        id: 2,
    };

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new("SRV01").with_database(
            MemoryDatabase::new("Sales", 150)
                .with_object(ORDERS, Some("dbo"), "Orders", &[])
                .with_object(CUSTOMERS, Some("dbo"), "Customers", &[])
                .with_object(
                    ObjectKey::new(ObjectCategory::View, 10),
                    Some("dbo"),
                    "vOrders",
                    &[],
                )
                .with_dependency(ORDERS, CUSTOMERS)
                .with_rows(ORDERS, &["INSERT [dbo].[Orders] ([Id]) VALUES (1)"])
                .with_rows(
                    CUSTOMERS,
                    &[
                        "INSERT [dbo].[Customers] ([Id]) VALUES (1)",
                        "INSERT [dbo].[Customers] ([Id]) VALUES (2)",
                    ],
                ),
        )
    }

    async fn run(pipeline: &DataPipeline) -> Vec<ScriptOutput> {
        let mut events = Vec::new();
        pipeline
            .process(&mut |e| {
                events.push(e);
                Ok(())
            })
            .await
            .unwrap();
        events
    }

    #[tokio::test]
    async fn test_tables_in_dependency_order() {
        let pipeline = DataPipeline::new(Arc::new(catalog()), DataPolicy::default());
        let events = run(&pipeline).await;

        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Sales", "Customers", "Customers", "Orders"]);
        assert_eq!(events[0].text, "Use [Sales]\nGO\n");
        assert_eq!(
            events[1].text,
            "INSERT [dbo].[Customers] ([Id]) VALUES (1)\nGO\n"
        );
        assert_eq!(
            events[2].text,
            "INSERT [dbo].[Customers] ([Id]) VALUES (2)\nGO\n"
        );
    }

    #[tokio::test]
    async fn test_batches_counted_once_per_table() {
        let pipeline = DataPipeline::new(Arc::new(catalog()), DataPolicy::default());
        let stats = pipeline.process(&mut |_| Ok(())).await.unwrap();
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.events, 4);
    }

    #[tokio::test]
    async fn test_batch_written_before_next_batch_rendered() {
        let catalog = catalog();
        let pipeline = DataPipeline::new(Arc::new(catalog.clone()), DataPolicy::default());
        let mut seen = Vec::new();
        let err = pipeline
            .process(&mut |e| {
                if e.type_name == "Table" {
                    seen.push(e.text);
                    return Err(std::io::Error::other("disk full").into());
                }
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, crate::error::BackupError::Io(_)));
        assert_eq!(seen, vec!["INSERT [dbo].[Customers] ([Id]) VALUES (1)\nGO\n"]);
        assert_eq!(catalog.calls().await.last(), Some(&CatalogCall::Disconnect));
    }

    #[tokio::test]
    async fn test_discovered_tables_skipped_when_disabled() {
        let catalog = catalog();
        let policy = DataPolicy {
            use_database: false,
            include_discovered_dependencies: false,
            ..DataPolicy::default()
        };
        let pipeline = DataPipeline::new(Arc::new(catalog.clone()), policy)
            .with_tables(NameFilter::parse_list("Orders"));
        let events = run(&pipeline).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Orders");
        assert!(catalog
            .calls()
            .await
            .contains(&CatalogCall::Expand {
                database: "Sales".into(),
                seeds: 1,
            }));
    }

    #[tokio::test]
    async fn test_empty_table_yields_no_event() {
        let catalog = MemoryCatalog::new("SRV01").with_database(
            MemoryDatabase::new("Sales", 150).with_object(ORDERS, Some("dbo"), "Orders", &[]),
        );
        let policy = DataPolicy {
            use_database: false,
            ..DataPolicy::default()
        };
        let events = run(&DataPipeline::new(Arc::new(catalog), policy)).await;
        assert!(events.is_empty());
    }
}
