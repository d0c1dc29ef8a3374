use tracing::{debug, warn};

use crate::core::{DatabaseHandle, NameFilter, ObjectCatalog, ObjectCategory, ScriptableObject};
use crate::error::Result;

/// Highest compatibility level without partitioning support (SQL Server 2000).
pub const LEGACY_COMPATIBILITY_LEVEL: u8 = 80;

/// Resolves the in-scope objects of one database.
///
/// Categories are concatenated in [`ObjectCategory::RESOLUTION_ORDER`]
/// regardless of the order they were enabled in. Only tables honor the
/// table filter.
#[derive(Debug, Clone)]
pub struct ObjectResolver {
    categories: Vec<ObjectCategory>,
    table_filter: Option<NameFilter>,
}

impl ObjectResolver {
    pub fn new(categories: &[ObjectCategory], table_filter: Option<NameFilter>) -> Self {
        let categories = ObjectCategory::RESOLUTION_ORDER
            .iter()
            .copied()
            .filter(|c| categories.contains(c))
            .collect();
        Self {
            categories,
            table_filter,
        }
    }

    /// Enabled categories in resolution order.
    pub fn categories(&self) -> &[ObjectCategory] {
        &self.categories
    }

    pub async fn resolve(
        &self,
        catalog: &dyn ObjectCatalog,
        db: &DatabaseHandle,
    ) -> Result<Vec<ScriptableObject>> {
        let mut objects = Vec::new();
        let mut compatibility_level = None;

        for &category in &self.categories {
            if matches!(
                category,
                ObjectCategory::PartitionFunction | ObjectCategory::PartitionScheme
            ) {
                let level = match compatibility_level {
                    Some(level) => level,
                    None => {
                        let level = catalog.compatibility_level(db).await?;
                        compatibility_level = Some(level);
                        level
                    }
                };
                if level <= LEGACY_COMPATIBILITY_LEVEL {
                    warn!(
                        "Skipping {} in {}: compatibility level {} has no partitioning",
                        category, db.name, level
                    );
                    continue;
                }
            }

            let filter = match category {
                ObjectCategory::Table => self.table_filter.as_ref(),
                _ => None,
            };
            let found = catalog.list_objects(db, category, filter).await?;
            debug!("{}: {} {} object(s)", db.name, found.len(), category);
            objects.extend(found);
        }

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCall, MemoryCatalog, MemoryDatabase};
    use crate::core::ObjectKey;

    fn key(category: ObjectCategory, id: i32) -> ObjectKey {
        ObjectKey::new(category, id)
    }

    fn database(level: u8) -> MemoryDatabase {
        MemoryDatabase::new("Sales", level)
            .with_object(key(ObjectCategory::View, 10), Some("dbo"), "vOrders", &[])
            .with_object(key(ObjectCategory::Table, 1), Some("dbo"), "Orders", &[])
            .with_object(key(ObjectCategory::Table, 2), Some("dbo"), "Customers", &[])
            .with_system_object(key(ObjectCategory::Table, 3), Some("dbo"), "sysdiagrams")
            .with_object(key(ObjectCategory::PartitionFunction, 1), None, "pfYear", &[])
    }

    fn names(objects: &[ScriptableObject]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fixed_category_order() {
        let catalog = MemoryCatalog::new("SRV01").with_database(database(150));
        let resolver = ObjectResolver::new(
            &[
                ObjectCategory::PartitionFunction,
                ObjectCategory::View,
                ObjectCategory::Table,
            ],
            None,
        );
        let db = DatabaseHandle::new("Sales", 150);
        let objects = resolver.resolve(&catalog, &db).await.unwrap();
        assert_eq!(names(&objects), vec!["Orders", "Customers", "vOrders", "pfYear"]);
    }

    #[tokio::test]
    async fn test_table_filter_applies_to_tables_only() {
        let catalog = MemoryCatalog::new("SRV01").with_database(database(150));
        let resolver = ObjectResolver::new(
            &[ObjectCategory::Table, ObjectCategory::View],
            NameFilter::parse_list("Customers,vOrders"),
        );
        let db = DatabaseHandle::new("Sales", 150);
        let objects = resolver.resolve(&catalog, &db).await.unwrap();
        assert_eq!(names(&objects), vec!["Customers", "vOrders"]);
    }

    #[tokio::test]
    async fn test_partitions_gated_on_legacy_level() {
        let catalog = MemoryCatalog::new("SRV01").with_database(database(80));
        let resolver = ObjectResolver::new(
            &[ObjectCategory::PartitionFunction, ObjectCategory::PartitionScheme],
            None,
        );
        let db = DatabaseHandle::new("Sales", 80);
        let objects = resolver.resolve(&catalog, &db).await.unwrap();
        assert!(objects.is_empty());
        assert!(!catalog
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, CatalogCall::ListObjects { .. })));
    }
}
