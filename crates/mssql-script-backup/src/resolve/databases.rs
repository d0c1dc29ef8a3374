use tracing::info;

use crate::core::{admits, DatabaseHandle, NameFilter, ObjectCatalog};
use crate::error::Result;

/// Selects the databases a run processes.
///
/// System databases are always excluded. A name filter keeps only listed
/// databases, in server enumeration order.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSelector {
    filter: Option<NameFilter>,
}

impl DatabaseSelector {
    pub fn new(filter: Option<NameFilter>) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> Option<&NameFilter> {
        self.filter.as_ref()
    }

    pub async fn resolve(&self, catalog: &dyn ObjectCatalog) -> Result<Vec<DatabaseHandle>> {
        let databases: Vec<DatabaseHandle> = catalog
            .list_databases(true)
            .await?
            .into_iter()
            .filter(|db| admits(self.filter.as_ref(), &db.name))
            .collect();

        info!(
            "Selected {} database(s) on {}",
            databases.len(),
            catalog.server_name()
        );
        Ok(databases)
    }
}
