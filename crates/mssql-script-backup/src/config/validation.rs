//! Configuration validation.

use super::BackupConfig;
use crate::error::{BackupError, Result};
use crate::output::OutputTemplate;

/// Validate the configuration.
pub fn validate(config: &BackupConfig) -> Result<()> {
    if config.connection.connection_string.trim().is_empty() {
        return Err(BackupError::Config(
            "connection.connection_string is required".into(),
        ));
    }

    if config.output.trim().is_empty() {
        return Err(BackupError::Config("output template is required".into()));
    }
    OutputTemplate::parse(&config.output)?;

    if config.kind.includes_data() && config.data.rows_per_batch == 0 {
        return Err(BackupError::Config(
            "data.rows_per_batch must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, ExportKind};

    fn valid_config() -> BackupConfig {
        BackupConfig {
            connection: ConnectionConfig {
                connection_string: "Server=tcp:localhost,1433;User Id=sa;Password=secret"
                    .to_string(),
            },
            output: "out/{1}/{2}.{5}.sql".to_string(),
            ..BackupConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_connection() {
        let mut config = valid_config();
        config.connection.connection_string = "  ".to_string();
        assert!(matches!(validate(&config), Err(BackupError::Config(_))));
    }

    #[test]
    fn test_missing_output() {
        let mut config = valid_config();
        config.output = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_template() {
        let mut config = valid_config();
        config.output = "out/{7}.sql".to_string();
        assert!(matches!(validate(&config), Err(BackupError::Template(_))));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid_config();
        config.data.rows_per_batch = 0;
        assert!(validate(&config).is_err());

        config.kind = ExportKind::Schema;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let config = valid_config();
        let debug_output = format!("{:?}", config.connection);
        assert!(debug_output.contains("Password=[REDACTED]"));
        assert!(!debug_output.contains("secret"));
    }
}
