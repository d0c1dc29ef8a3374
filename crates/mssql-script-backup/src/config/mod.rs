//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl BackupConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// The result is not validated: command-line flags may still fill in
    /// the connection or output. Call [`BackupConfig::validate`] once they
    /// are applied.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BackupConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CreateDatabaseMode;

    #[test]
    fn test_from_yaml_partial_sections() {
        let config = BackupConfig::from_yaml(
            r#"
connection:
  connection_string: "Server=db01;Integrated Security=True"
output: "backup/{1}/{3}/{2}.{5}.sql"
kind: schema
databases: [Sales, HR]
schema:
  create_database: minimal
  script_views: false
data:
  rows_per_batch: 500
"#,
        )
        .unwrap();

        assert_eq!(config.kind, ExportKind::Schema);
        assert_eq!(config.schema.create_database, CreateDatabaseMode::Minimal);
        assert!(!config.schema.script_views);
        assert!(config.schema.script_tables);
        assert_eq!(config.data.rows_per_batch, 500);
        assert!(config.data.use_database);
        assert_eq!(config.combined_output, None);

        let filter = config.database_filter().unwrap();
        assert!(filter.contains("HR"));
        assert!(config.table_filter().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.yaml");
        std::fs::write(
            &path,
            "connection:\n  connection_string: Server=db01\noutput: out/{1}.sql\ncombined_output: true\n",
        )
        .unwrap();

        let config = BackupConfig::load(&path).unwrap();
        assert_eq!(config.combined_output, Some(true));
        assert_eq!(config.kind, ExportKind::All);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(BackupConfig::from_yaml("kind: everything\n").is_err());
        assert_eq!("DATA".parse::<ExportKind>().unwrap(), ExportKind::Data);
    }
}
