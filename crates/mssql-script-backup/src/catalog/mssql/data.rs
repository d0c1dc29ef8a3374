//! Row reading and INSERT batch rendering for data scripts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::Row;
use uuid::Uuid;

use crate::core::identifier::{qualify_mssql, quote_mssql};
use crate::core::schema::{Column, Table};
use crate::core::SqlValue;
use crate::error::Result;
use crate::policy::DataScriptOptions;

/// SELECT list for the insertable columns of a table.
///
/// Types the driver cannot decode directly are converted server-side: xml
/// and sql_variant to text, CLR types to their binary form.
pub fn select_list(table: &Table) -> Result<String> {
    let exprs: Result<Vec<String>> = table
        .insertable_columns()
        .map(|col| {
            let name = quote_mssql(&col.name)?;
            Ok(match read_as(col) {
                ReadAs::Text if needs_text_cast(col) => {
                    format!("CONVERT(NVARCHAR(MAX), {})", name)
                }
                ReadAs::Bytes if needs_binary_cast(col) => {
                    format!("CONVERT(VARBINARY(MAX), {})", name)
                }
                _ => name,
            })
        })
        .collect();
    Ok(exprs?.join(", "))
}

/// `SELECT ... FROM [db].[schema].[table]`.
pub fn select_rows(database: &str, table: &Table) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {}.{}",
        select_list(table)?,
        quote_mssql(database)?,
        qualify_mssql(&table.schema, &table.name)?
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadAs {
    Bool,
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Uuid,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Date,
    Time,
    Bytes,
    Text,
}

fn read_as(col: &Column) -> ReadAs {
    match col.storage_type().to_lowercase().as_str() {
        "bit" => ReadAs::Bool,
        "tinyint" => ReadAs::U8,
        "smallint" => ReadAs::I16,
        "int" => ReadAs::I32,
        "bigint" => ReadAs::I64,
        "real" => ReadAs::F32,
        "float" => ReadAs::F64,
        "decimal" | "numeric" | "money" | "smallmoney" => ReadAs::Decimal,
        "uniqueidentifier" => ReadAs::Uuid,
        "datetime" | "smalldatetime" => ReadAs::DateTime,
        "datetime2" => ReadAs::DateTime2,
        "datetimeoffset" => ReadAs::DateTimeOffset,
        "date" => ReadAs::Date,
        "time" => ReadAs::Time,
        "binary" | "varbinary" | "image" | "hierarchyid" | "geometry" | "geography" => {
            ReadAs::Bytes
        }
        _ => ReadAs::Text,
    }
}

fn needs_text_cast(col: &Column) -> bool {
    matches!(
        col.storage_type().to_lowercase().as_str(),
        "xml" | "sql_variant"
    )
}

fn needs_binary_cast(col: &Column) -> bool {
    matches!(
        col.storage_type().to_lowercase().as_str(),
        "hierarchyid" | "geometry" | "geography"
    )
}

/// Convert a row value to SqlValue based on the column type.
pub fn convert_row_value(row: &Row, idx: usize, col: &Column) -> SqlValue {
    let value = match read_as(col) {
        ReadAs::Bool => row.get::<bool, _>(idx).map(SqlValue::Bool),
        ReadAs::U8 => row.get::<u8, _>(idx).map(|v| SqlValue::Int(v as i64)),
        ReadAs::I16 => row.get::<i16, _>(idx).map(|v| SqlValue::Int(v as i64)),
        ReadAs::I32 => row.get::<i32, _>(idx).map(|v| SqlValue::Int(v as i64)),
        ReadAs::I64 => row.get::<i64, _>(idx).map(SqlValue::Int),
        ReadAs::F32 => row.get::<f32, _>(idx).map(SqlValue::F32),
        ReadAs::F64 => row.get::<f64, _>(idx).map(SqlValue::F64),
        ReadAs::Decimal => row
            .try_get::<Decimal, _>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Decimal)
            .or_else(|| {
                // money arrives as a float
                row.try_get::<f64, _>(idx).ok().flatten().map(|f| {
                    Decimal::try_from(f)
                        .map(SqlValue::Decimal)
                        .unwrap_or(SqlValue::F64(f))
                })
            }),
        ReadAs::Uuid => row.get::<Uuid, _>(idx).map(SqlValue::Uuid),
        ReadAs::DateTime => row.get::<NaiveDateTime, _>(idx).map(SqlValue::DateTime),
        ReadAs::DateTime2 => row.get::<NaiveDateTime, _>(idx).map(SqlValue::DateTime2),
        ReadAs::DateTimeOffset => row
            .get::<DateTime<FixedOffset>, _>(idx)
            .map(SqlValue::DateTimeOffset),
        ReadAs::Date => row.get::<NaiveDate, _>(idx).map(SqlValue::Date),
        ReadAs::Time => row.get::<NaiveTime, _>(idx).map(SqlValue::Time),
        ReadAs::Bytes => row
            .get::<&[u8], _>(idx)
            .map(|v| SqlValue::Bytes(v.to_vec())),
        ReadAs::Text => row
            .get::<&str, _>(idx)
            .map(|s| SqlValue::Text(s.to_string())),
    };
    value.unwrap_or(SqlValue::Null)
}

/// Renders INSERT batches for one table, `rows_per_batch` rows at a time.
///
/// Identity tables get `SET IDENTITY_INSERT` inside every batch so each
/// batch can be replayed on its own.
#[derive(Debug, Clone)]
pub struct InsertBatcher {
    qualified: String,
    columns: String,
    identity: bool,
    rows_per_batch: usize,
    pending: Vec<Vec<SqlValue>>,
}

impl InsertBatcher {
    pub fn new(table: &Table, options: &DataScriptOptions) -> Result<Self> {
        let columns: Result<Vec<String>> = table
            .insertable_columns()
            .map(|c| quote_mssql(&c.name))
            .collect();
        let rows_per_batch = options.rows_per_batch.max(1);
        Ok(Self {
            qualified: qualify_mssql(&table.schema, &table.name)?,
            columns: columns?.join(", "),
            identity: table.has_identity(),
            rows_per_batch,
            pending: Vec::with_capacity(rows_per_batch),
        })
    }

    /// Buffer one row. Returns a finished batch once `rows_per_batch` rows
    /// are pending.
    pub fn push(&mut self, row: Vec<SqlValue>) -> Option<String> {
        self.pending.push(row);
        if self.pending.len() < self.rows_per_batch {
            return None;
        }
        self.flush()
    }

    /// Render whatever rows are still pending.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut lines = Vec::with_capacity(self.pending.len() + 2);
        if self.identity {
            lines.push(format!("SET IDENTITY_INSERT {} ON", self.qualified));
        }
        for row in self.pending.drain(..) {
            let values: Vec<String> = row.iter().map(SqlValue::to_mssql_literal).collect();
            lines.push(format!(
                "INSERT {} ({}) VALUES ({})",
                self.qualified,
                self.columns,
                values.join(", ")
            ));
        }
        if self.identity {
            lines.push(format!("SET IDENTITY_INSERT {} OFF", self.qualified));
        }
        Some(lines.join("\n"))
    }
}
