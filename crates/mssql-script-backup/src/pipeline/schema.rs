use std::sync::Arc;

use async_trait::async_trait;

use crate::core::identifier::quote_mssql;
use crate::core::{
    CatalogConnector, DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory, ScriptableObject,
};
use crate::error::Result;
use crate::policy::{CreateDatabaseMode, SchemaPolicy, ScriptOptions};
use crate::resolve::{DatabaseSelector, DependencyOrderer, ObjectResolver};

use super::{ExportPipeline, PipelineKind, ScriptSink};

/// Scripts the DDL of every enabled category.
pub struct SchemaPipeline {
    connector: Arc<dyn CatalogConnector>,
    policy: SchemaPolicy,
    options: ScriptOptions,
    selector: DatabaseSelector,
    resolver: ObjectResolver,
    orderer: DependencyOrderer,
}

impl SchemaPipeline {
    pub fn new(connector: Arc<dyn CatalogConnector>, policy: SchemaPolicy) -> Self {
        let categories = policy.enabled_categories();
        Self {
            connector,
            options: policy.script_options(),
            selector: DatabaseSelector::default(),
            resolver: ObjectResolver::new(&categories, None),
            orderer: DependencyOrderer::new(policy.enforce_dependencies)
                .with_discovered(policy.include_discovered_dependencies, &categories),
            policy,
        }
    }

    /// Restrict the run to the named databases.
    pub fn with_databases(mut self, filter: Option<NameFilter>) -> Self {
        self.selector = DatabaseSelector::new(filter);
        self
    }

    /// Restrict table resolution to the named tables.
    pub fn with_tables(mut self, filter: Option<NameFilter>) -> Self {
        self.resolver = ObjectResolver::new(self.resolver.categories(), filter);
        self
    }

    pub fn policy(&self) -> &SchemaPolicy {
        &self.policy
    }
}

#[async_trait]
impl ExportPipeline for SchemaPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Schema
    }

    fn connector(&self) -> &dyn CatalogConnector {
        self.connector.as_ref()
    }

    fn selector(&self) -> &DatabaseSelector {
        &self.selector
    }

    async fn preamble(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<String>> {
        let mut fragments = match self.policy.create_database {
            CreateDatabaseMode::None => Vec::new(),
            CreateDatabaseMode::Minimal => {
                vec![format!("Create Database {}", quote_mssql(&db.name)?)]
            }
            CreateDatabaseMode::Full => catalog.render_database(db, &self.options).await?,
        };
        if self.policy.use_database {
            fragments.push(format!("Use {}", quote_mssql(&db.name)?));
        }
        Ok(fragments)
    }

    async fn objects(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<ScriptableObject>> {
        let seeds = self.resolver.resolve(catalog, db).await?;
        self.orderer.order(catalog, db, seeds).await
    }

    async fn render(
        &self,
        catalog: &dyn ObjectCatalog,
        object: &ScriptableObject,
        emit: &mut ScriptSink<'_>,
    ) -> Result<()> {
        if object.category() == ObjectCategory::Database {
            return Ok(());
        }
        emit(catalog.render_script(object, &self.options).await?)
    }
}
