use tracing::{debug, info};

use crate::core::{DatabaseHandle, ObjectCatalog, ObjectCategory, ScriptableObject};
use crate::error::Result;

/// Decides the emission order of a database's resolved objects.
///
/// Without enforcement objects pass through in resolution order. With it,
/// the catalog's dependency expansion produces the order and may add objects
/// the resolver never returned; those are kept unless `include_discovered`
/// is off, in which case only objects of the `allowed` categories survive.
#[derive(Debug, Clone)]
pub struct DependencyOrderer {
    enforce: bool,
    include_discovered: bool,
    allowed: Vec<ObjectCategory>,
}

impl DependencyOrderer {
    pub fn new(enforce: bool) -> Self {
        Self {
            enforce,
            include_discovered: true,
            allowed: Vec::new(),
        }
    }

    /// Drop discovered objects outside `allowed` when `include` is false.
    pub fn with_discovered(mut self, include: bool, allowed: &[ObjectCategory]) -> Self {
        self.include_discovered = include;
        self.allowed = allowed.to_vec();
        self
    }

    pub async fn order(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
        seeds: Vec<ScriptableObject>,
    ) -> Result<Vec<ScriptableObject>> {
        if !self.enforce {
            return Ok(seeds);
        }
        // Expansion of an empty seed set is a catalog error.
        if seeds.is_empty() {
            debug!("{}: nothing to order", db.name);
            return Ok(seeds);
        }

        let keys = catalog.expand_dependency_order(db, &seeds, true).await?;
        let mut ordered = Vec::with_capacity(keys.len());
        for key in keys {
            let object = match seeds.iter().find(|s| s.key == key) {
                Some(seed) => seed.clone(),
                None => catalog.lookup(db, key).await?,
            };
            if !self.include_discovered && !self.allowed.contains(&object.category()) {
                debug!(
                    "{}: dropping discovered {} {}",
                    db.name,
                    object.type_name(),
                    object.qualified_name()
                );
                continue;
            }
            ordered.push(object);
        }

        if ordered.len() > seeds.len() {
            info!(
                "{}: dependency expansion added {} object(s)",
                db.name,
                ordered.len() - seeds.len()
            );
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCall, MemoryCatalog, MemoryDatabase};
    use crate::core::ObjectKey;

    const ORDERS: ObjectKey = ObjectKey {
        category: ObjectCategory::Table,
        id: 1,
    };
    const CUSTOMERS: ObjectKey = ObjectKey {
        category: ObjectCategory::Table,
        id: 2,
    };
    const V_ORDERS: ObjectKey = ObjectKey {
        category: ObjectCategory::View,
        id: 10,
    };

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new("SRV01").with_database(
            MemoryDatabase::new("Sales", 150)
                .with_object(ORDERS, Some("dbo"), "Orders", &[])
                .with_object(CUSTOMERS, Some("dbo"), "Customers", &[])
                .with_object(V_ORDERS, Some("dbo"), "vOrders", &[])
                .with_dependency(ORDERS, CUSTOMERS)
                .with_dependency(V_ORDERS, ORDERS),
        )
    }

    fn db() -> DatabaseHandle {
        DatabaseHandle::new("Sales", 150)
    }

    async fn views(catalog: &MemoryCatalog) -> Vec<ScriptableObject> {
        catalog
            .list_objects(&db(), ObjectCategory::View, None)
            .await
            .unwrap()
    }

    async fn tables(catalog: &MemoryCatalog) -> Vec<ScriptableObject> {
        catalog
            .list_objects(&db(), ObjectCategory::Table, None)
            .await
            .unwrap()
    }

    fn names(objects: &[ScriptableObject]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pass_through_without_enforcement() {
        let catalog = catalog();
        let seeds = tables(&catalog).await;
        let ordered = DependencyOrderer::new(false)
            .order(&catalog, &db(), seeds)
            .await
            .unwrap();
        assert_eq!(names(&ordered), vec!["Orders", "Customers"]);
    }

    #[tokio::test]
    async fn test_enforced_order_puts_dependencies_first() {
        let catalog = catalog();
        let seeds = tables(&catalog).await;
        let ordered = DependencyOrderer::new(true)
            .order(&catalog, &db(), seeds)
            .await
            .unwrap();
        assert_eq!(names(&ordered), vec!["Customers", "Orders"]);
    }

    #[tokio::test]
    async fn test_empty_seed_skips_expansion() {
        let catalog = catalog();
        let ordered = DependencyOrderer::new(true)
            .order(&catalog, &db(), Vec::new())
            .await
            .unwrap();
        assert!(ordered.is_empty());
        assert!(!catalog
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, CatalogCall::Expand { .. })));
    }

    #[tokio::test]
    async fn test_discovered_objects_are_looked_up() {
        let catalog = catalog();
        let seeds = views(&catalog).await;
        let ordered = DependencyOrderer::new(true)
            .order(&catalog, &db(), seeds)
            .await
            .unwrap();
        assert_eq!(names(&ordered), vec!["Customers", "Orders", "vOrders"]);
        assert_eq!(ordered[0].type_name(), "Table");

        let lookups = catalog
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, CatalogCall::Lookup { .. }))
            .count();
        assert_eq!(lookups, 2);
    }

    #[tokio::test]
    async fn test_discovered_objects_filtered_to_allowed_categories() {
        let catalog = catalog();
        let seeds = views(&catalog).await;
        let ordered = DependencyOrderer::new(true)
            .with_discovered(false, &[ObjectCategory::View])
            .order(&catalog, &db(), seeds)
            .await
            .unwrap();
        assert_eq!(names(&ordered), vec!["vOrders"]);
    }
}
