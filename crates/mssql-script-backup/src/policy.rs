//! Export policies for the schema and data pipelines.
//!
//! Policies are plain values: built once (defaults, then YAML/CLI overrides)
//! and passed by reference for the whole run. The catalog never sees a policy
//! directly; it receives the [`ScriptOptions`] or [`DataScriptOptions`]
//! derived from it.

use serde::{Deserialize, Serialize};

use crate::core::ObjectCategory;

/// How the schema preamble creates the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateDatabaseMode {
    /// No CREATE DATABASE statement.
    None,
    /// `Create Database [name]` only.
    Minimal,
    /// CREATE DATABASE rendered by the catalog (collation, compatibility level).
    #[default]
    Full,
}

/// SQL Server version the generated script targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetVersion {
    Sql2000,
    Sql2005,
    Sql2008,
    Sql2012,
    Sql2014,
    Sql2016,
    Sql2017,
    #[default]
    Sql2019,
    Sql2022,
}

impl TargetVersion {
    /// Compatibility level native to this version.
    pub fn compatibility_level(&self) -> u8 {
        match self {
            TargetVersion::Sql2000 => 80,
            TargetVersion::Sql2005 => 90,
            TargetVersion::Sql2008 => 100,
            TargetVersion::Sql2012 => 110,
            TargetVersion::Sql2014 => 120,
            TargetVersion::Sql2016 => 130,
            TargetVersion::Sql2017 => 140,
            TargetVersion::Sql2019 => 150,
            TargetVersion::Sql2022 => 160,
        }
    }

    /// `DROP ... IF EXISTS` arrived in SQL Server 2016.
    pub fn supports_drop_if_exists(&self) -> bool {
        *self >= TargetVersion::Sql2016
    }
}

/// Schema-mode policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaPolicy {
    pub create_database: CreateDatabaseMode,
    pub use_database: bool,
    pub script_tables: bool,
    pub script_views: bool,
    pub script_procedures: bool,
    pub script_udfs: bool,
    pub script_partition_functions: bool,
    pub script_partition_schemes: bool,
    pub enforce_dependencies: bool,
    /// Keep objects the dependency expansion pulls in from disabled categories.
    pub include_discovered_dependencies: bool,
    pub target_version: TargetVersion,
    pub script_indexes: bool,
    pub script_foreign_keys: bool,
    pub script_check_constraints: bool,
    pub script_drops: bool,
}

impl Default for SchemaPolicy {
    fn default() -> Self {
        Self {
            create_database: CreateDatabaseMode::Full,
            use_database: true,
            script_tables: true,
            script_views: true,
            script_procedures: true,
            script_udfs: true,
            script_partition_functions: false,
            script_partition_schemes: false,
            enforce_dependencies: true,
            include_discovered_dependencies: true,
            target_version: TargetVersion::default(),
            script_indexes: true,
            script_foreign_keys: true,
            script_check_constraints: true,
            script_drops: false,
        }
    }
}

impl SchemaPolicy {
    /// Whether a category is enabled by this policy.
    pub fn includes(&self, category: ObjectCategory) -> bool {
        match category {
            ObjectCategory::Table => self.script_tables,
            ObjectCategory::View => self.script_views,
            ObjectCategory::StoredProcedure => self.script_procedures,
            ObjectCategory::UserDefinedFunction => self.script_udfs,
            ObjectCategory::PartitionFunction => self.script_partition_functions,
            ObjectCategory::PartitionScheme => self.script_partition_schemes,
            ObjectCategory::Database => false,
        }
    }

    /// Enabled categories in resolution order.
    pub fn enabled_categories(&self) -> Vec<ObjectCategory> {
        ObjectCategory::RESOLUTION_ORDER
            .iter()
            .copied()
            .filter(|c| self.includes(*c))
            .collect()
    }

    /// Enable both partition categories.
    pub fn with_partitions(mut self) -> Self {
        self.script_partition_functions = true;
        self.script_partition_schemes = true;
        self
    }

    /// Rendering options for this policy.
    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            target_version: self.target_version,
            indexes: self.script_indexes,
            foreign_keys: self.script_foreign_keys,
            check_constraints: self.script_check_constraints,
            drops: self.script_drops,
        }
    }
}

/// Data-mode policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPolicy {
    pub use_database: bool,
    pub enforce_dependencies: bool,
    pub include_discovered_dependencies: bool,
    pub target_version: TargetVersion,
    /// INSERT statements per `GO` batch.
    pub rows_per_batch: usize,
}

impl Default for DataPolicy {
    fn default() -> Self {
        Self {
            use_database: true,
            enforce_dependencies: true,
            include_discovered_dependencies: true,
            target_version: TargetVersion::default(),
            rows_per_batch: 100,
        }
    }
}

impl DataPolicy {
    /// Data policy sharing the schema policy's ordering and version settings.
    pub fn from_schema(schema: &SchemaPolicy) -> Self {
        Self {
            use_database: schema.use_database,
            enforce_dependencies: schema.enforce_dependencies,
            include_discovered_dependencies: schema.include_discovered_dependencies,
            target_version: schema.target_version,
            ..Self::default()
        }
    }

    pub fn script_options(&self) -> DataScriptOptions {
        DataScriptOptions {
            target_version: self.target_version,
            rows_per_batch: self.rows_per_batch.max(1),
        }
    }
}

/// Options the catalog honors when rendering DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOptions {
    pub target_version: TargetVersion,
    pub indexes: bool,
    pub foreign_keys: bool,
    pub check_constraints: bool,
    pub drops: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        SchemaPolicy::default().script_options()
    }
}

/// Options the catalog honors when rendering row inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataScriptOptions {
    pub target_version: TargetVersion,
    pub rows_per_batch: usize,
}

impl Default for DataScriptOptions {
    fn default() -> Self {
        DataPolicy::default().script_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults() {
        let policy = SchemaPolicy::default();
        assert_eq!(policy.create_database, CreateDatabaseMode::Full);
        assert!(policy.enforce_dependencies);
        assert_eq!(
            policy.enabled_categories(),
            vec![
                ObjectCategory::Table,
                ObjectCategory::View,
                ObjectCategory::StoredProcedure,
                ObjectCategory::UserDefinedFunction,
            ]
        );
        assert_eq!(policy.with_partitions().enabled_categories().len(), 6);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: SchemaPolicy =
            serde_yaml::from_str("script_views: false\ncreate_database: minimal\n").unwrap();
        assert!(!policy.script_views);
        assert!(policy.script_tables);
        assert_eq!(policy.create_database, CreateDatabaseMode::Minimal);
    }

    #[test]
    fn test_target_version_gates() {
        assert!(!TargetVersion::Sql2014.supports_drop_if_exists());
        assert!(TargetVersion::Sql2016.supports_drop_if_exists());
        assert_eq!(TargetVersion::Sql2000.compatibility_level(), 80);
    }

    #[test]
    fn test_data_policy_follows_schema_policy() {
        let schema = SchemaPolicy {
            use_database: false,
            enforce_dependencies: false,
            target_version: TargetVersion::Sql2014,
            ..SchemaPolicy::default()
        };
        let data = DataPolicy::from_schema(&schema);
        assert!(!data.use_database);
        assert!(!data.enforce_dependencies);
        assert_eq!(data.target_version, TargetVersion::Sql2014);
        assert_eq!(data.rows_per_batch, 100);
    }

    #[test]
    fn test_data_batch_size_never_zero() {
        let policy = DataPolicy {
            rows_per_batch: 0,
            ..DataPolicy::default()
        };
        assert_eq!(policy.script_options().rows_per_batch, 1);
    }
}
