//! Identifier quoting and literal escaping for generated T-SQL.
//!
//! Catalog names are spliced into script text and into the catalog's own
//! three-part-name queries (`[db].sys.tables`), where they cannot be bound as
//! parameters. Every name therefore goes through [`quote_mssql`], which
//! validates and bracket-quotes it.

use crate::error::{BackupError, Result};

/// Maximum SQL Server identifier length in characters.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers longer than SQL Server allows.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BackupError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(BackupError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(BackupError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} characters: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote a SQL Server identifier using brackets.
///
/// ```ignore
/// assert_eq!(quote_mssql("users")?, "[users]");
/// assert_eq!(quote_mssql("table]name")?, "[table]]name]");
/// ```
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Qualify a SQL Server object name with its schema.
pub fn qualify_mssql(schema: &str, name: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_mssql(schema)?, quote_mssql(name)?))
}

/// Unicode string literal: `N'O''Brien'`.
pub fn unicode_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}
