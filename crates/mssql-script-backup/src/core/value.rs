//! SQL values read from table rows and rendered as T-SQL literals.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::identifier::unicode_literal;

/// One column value of a row being scripted as an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL of any type.
    Null,

    /// bit
    Bool(bool),

    /// tinyint, smallint, int, bigint
    Int(i64),

    /// real
    F32(f32),

    /// float
    F64(f64),

    /// char, varchar, nchar, nvarchar, text, ntext, xml
    Text(String),

    /// binary, varbinary, image
    Bytes(Vec<u8>),

    /// uniqueidentifier
    Uuid(Uuid),

    /// decimal, numeric, money, smallmoney
    Decimal(Decimal),

    /// datetime, smalldatetime (millisecond precision literal)
    DateTime(NaiveDateTime),

    /// datetime2 (100ns precision literal)
    DateTime2(NaiveDateTime),

    /// datetimeoffset
    DateTimeOffset(DateTime<FixedOffset>),

    /// date
    Date(NaiveDate),

    /// time
    Time(NaiveTime),
}

impl SqlValue {
    /// Render the value as a T-SQL literal.
    pub fn to_mssql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::F32(v) => format!("{:?}", v),
            SqlValue::F64(v) => format!("{:?}", v),
            SqlValue::Text(v) => unicode_literal(v),
            SqlValue::Bytes(v) => {
                let mut out = String::with_capacity(2 + v.len() * 2);
                out.push_str("0x");
                for b in v {
                    out.push_str(&format!("{:02X}", b));
                }
                out
            }
            SqlValue::Uuid(v) => format!("'{}'", v.to_string().to_uppercase()),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::DateTime(v) => format!("'{}'", v.format("%Y-%m-%dT%H:%M:%S%.3f")),
            SqlValue::DateTime2(v) => format!(
                "'{}.{}'",
                v.format("%Y-%m-%dT%H:%M:%S"),
                hundred_nanos(v.nanosecond())
            ),
            SqlValue::DateTimeOffset(v) => format!(
                "'{}.{}{}'",
                v.format("%Y-%m-%dT%H:%M:%S"),
                hundred_nanos(v.nanosecond()),
                v.format("%:z")
            ),
            SqlValue::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
            SqlValue::Time(v) => format!(
                "'{}.{}'",
                v.format("%H:%M:%S"),
                hundred_nanos(v.nanosecond())
            ),
        }
    }
}

/// Seven fractional digits, the precision of datetime2 and time.
fn hundred_nanos(nanos: u32) -> String {
    // Leap-second nanos (>= 1e9) clamp to the last representable tick.
    format!("{:07}", (nanos.min(999_999_999)) / 100)
}
