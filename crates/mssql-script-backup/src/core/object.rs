//! Database object model shared by catalogs, resolvers and pipelines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of a scriptable database object.
///
/// The string form of each variant is the object type name carried in
/// [`ScriptOutput`](crate::pipeline::ScriptOutput) and substituted for the
/// `{3}` template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectCategory {
    Table,
    View,
    StoredProcedure,
    UserDefinedFunction,
    PartitionFunction,
    PartitionScheme,
    Database,
}

impl ObjectCategory {
    /// Object categories in the fixed resolution order.
    pub const RESOLUTION_ORDER: [ObjectCategory; 6] = [
        ObjectCategory::Table,
        ObjectCategory::View,
        ObjectCategory::StoredProcedure,
        ObjectCategory::UserDefinedFunction,
        ObjectCategory::PartitionFunction,
        ObjectCategory::PartitionScheme,
    ];

    /// Type name used in output events and file names.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectCategory::Table => "Table",
            ObjectCategory::View => "View",
            ObjectCategory::StoredProcedure => "StoredProcedure",
            ObjectCategory::UserDefinedFunction => "UserDefinedFunction",
            ObjectCategory::PartitionFunction => "PartitionFunction",
            ObjectCategory::PartitionScheme => "PartitionScheme",
            ObjectCategory::Database => "Database",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Opaque catalog reference to one object within a database.
///
/// Tables, views, procedures and functions share the `object_id` space;
/// partition functions and schemes have their own id spaces, so the category
/// is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub category: ObjectCategory,
    pub id: i32,
}

impl ObjectKey {
    pub fn new(category: ObjectCategory, id: i32) -> Self {
        Self { category, id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.id)
    }
}

/// A database on the server, as enumerated by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHandle {
    /// Database name.
    pub name: String,

    /// Compatibility level (e.g. 80 for SQL Server 2000, 150 for 2019).
    pub compatibility_level: u8,
}

impl DatabaseHandle {
    pub fn new(name: impl Into<String>, compatibility_level: u8) -> Self {
        Self {
            name: name.into(),
            compatibility_level,
        }
    }
}

/// A resolved object ready to be scripted. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptableObject {
    /// Owning database name.
    pub database: String,

    /// Owning schema, for schema-scoped categories.
    pub schema: Option<String>,

    /// Object name (unqualified).
    pub name: String,

    /// Catalog reference used to request script text.
    pub key: ObjectKey,
}

impl ScriptableObject {
    pub fn category(&self) -> ObjectCategory {
        self.key.category
    }

    /// Object type name, e.g. `"Table"`.
    pub fn type_name(&self) -> &'static str {
        self.key.category.type_name()
    }

    /// `schema.name` for schema-scoped objects, `name` otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Optional allow-list of names. An empty filter is never constructed;
/// absence of a filter means "all".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameFilter {
    names: BTreeSet<String>,
}

impl NameFilter {
    /// Build a filter from names, returning `None` when no names are given.
    pub fn from_names<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(Into::into)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    /// Parse a comma-separated list (`"Sales, HR"`).
    pub fn parse_list(list: &str) -> Option<Self> {
        Self::from_names(list.split(','))
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Apply an optional filter: `None` admits every name.
pub fn admits(filter: Option<&NameFilter>, name: &str) -> bool {
    filter.map_or(true, |f| f.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(ObjectCategory::Table.type_name(), "Table");
        assert_eq!(ObjectCategory::StoredProcedure.to_string(), "StoredProcedure");
        assert_eq!(ObjectCategory::Database.type_name(), "Database");
    }

    #[test]
    fn test_name_filter_parse_list() {
        let filter = NameFilter::parse_list("Sales, HR,,").unwrap();
        assert!(filter.contains("Sales"));
        assert!(filter.contains("HR"));
        assert!(!filter.contains("Marketing"));
        assert!(NameFilter::parse_list(" , ").is_none());
    }

    #[test]
    fn test_admits_without_filter() {
        assert!(admits(None, "anything"));
        let filter = NameFilter::from_names(["Orders"]);
        assert!(admits(filter.as_ref(), "Orders"));
        assert!(!admits(filter.as_ref(), "orders"));
    }

    #[test]
    fn test_qualified_name() {
        let obj = ScriptableObject {
            database: "Sales".into(),
            schema: Some("dbo".into()),
            name: "Orders".into(),
            key: ObjectKey::new(ObjectCategory::Table, 7),
        };
        assert_eq!(obj.qualified_name(), "dbo.Orders");
        assert_eq!(obj.type_name(), "Table");
    }
}
