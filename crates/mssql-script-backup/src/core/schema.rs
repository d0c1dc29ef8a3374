//! Table metadata used to render CREATE TABLE scripts.
//!
//! The catalog loads these from `sys.*` views of the owning database; the
//! renderer in `catalog::mssql::ddl` turns them back into T-SQL.

use serde::{Deserialize, Serialize};

/// Table metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key constraint, if any.
    pub primary_key: Option<KeyConstraint>,

    /// Unique constraints (not unique indexes).
    pub unique_constraints: Vec<KeyConstraint>,

    /// Indexes that do not back a key constraint.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Check constraints.
    pub check_constraints: Vec<CheckConstraint>,

    /// Partition scheme and column the table is stored on.
    pub partition: Option<PartitionPlacement>,
}

impl Table {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Check if the table has an identity column.
    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.identity.is_some())
    }

    /// Columns whose values can be inserted (not computed, not rowversion).
    pub fn insertable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.computed.is_none() && !c.is_rowversion())
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Type name (e.g., "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Schema of a user-defined type; `None` for system types.
    pub type_schema: Option<String>,

    /// System type behind a user-defined alias type.
    pub base_type: Option<String>,

    /// Maximum length in characters for string types, bytes for binary (-1 for max).
    pub max_length: i32,

    /// Numeric precision.
    pub precision: i32,

    /// Numeric or temporal scale.
    pub scale: i32,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Identity seed and increment.
    pub identity: Option<Identity>,

    /// Computed column definition.
    pub computed: Option<ComputedColumn>,

    /// Named default constraint.
    pub default: Option<DefaultConstraint>,

    /// Explicit collation differing from the database default.
    pub collation: Option<String>,
}

impl Column {
    /// Type the value is stored as: the base type for alias types.
    pub fn storage_type(&self) -> &str {
        self.base_type.as_deref().unwrap_or(&self.data_type)
    }

    /// rowversion/timestamp columns are generated by the server.
    pub fn is_rowversion(&self) -> bool {
        matches!(
            self.storage_type().to_lowercase().as_str(),
            "timestamp" | "rowversion"
        )
    }
}

/// Identity specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub seed: i64,
    pub increment: i64,
}

/// Computed column definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedColumn {
    pub definition: String,
    pub is_persisted: bool,
}

/// Default constraint on a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultConstraint {
    pub name: String,
    pub definition: String,
}

/// Primary key or unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConstraint {
    /// Constraint name.
    pub name: String,

    /// Key columns with sort direction.
    pub columns: Vec<IndexColumn>,

    /// Whether the backing index is clustered.
    pub is_clustered: bool,
}

/// Index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed columns.
    pub columns: Vec<IndexColumn>,

    /// Whether the index is unique.
    pub is_unique: bool,

    /// Whether the index is clustered.
    pub is_clustered: bool,

    /// Included columns (non-key).
    pub include_cols: Vec<String>,

    /// Filter predicate of a filtered index.
    pub filter: Option<String>,
}

/// One key column of an index or key constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub descending: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Source column names.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced schema name.
    pub ref_schema: String,

    /// Referenced column names.
    pub ref_columns: Vec<String>,

    /// ON DELETE action (e.g. "NO_ACTION", "CASCADE").
    pub on_delete: String,

    /// ON UPDATE action.
    pub on_update: String,
}

/// Check constraint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,

    /// Constraint definition (SQL expression).
    pub definition: String,
}

/// Storage of a table on a partition scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionPlacement {
    pub scheme: String,
    pub column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
            ..Column::default()
        }
    }

    #[test]
    fn test_insertable_columns_skip_generated() {
        let mut computed = column("Total", "int");
        computed.computed = Some(ComputedColumn {
            definition: "([Qty]*[Price])".into(),
            is_persisted: false,
        });
        let table = Table {
            schema: "dbo".into(),
            name: "Orders".into(),
            columns: vec![column("Id", "int"), computed, column("Version", "timestamp")],
            ..Table::default()
        };

        let names: Vec<&str> = table.insertable_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Id"]);
        assert_eq!(table.full_name(), "dbo.Orders");
    }

    #[test]
    fn test_has_identity() {
        let mut id = column("Id", "int");
        let mut table = Table {
            columns: vec![id.clone()],
            ..Table::default()
        };
        assert!(!table.has_identity());

        id.identity = Some(Identity { seed: 1, increment: 1 });
        table.columns = vec![id];
        assert!(table.has_identity());
    }
}
