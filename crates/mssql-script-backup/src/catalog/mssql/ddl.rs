//! T-SQL rendering of catalog metadata.
//!
//! Every function returns script fragments; the pipeline appends a `GO`
//! separator after each one. Rendering is pure so it can be tested without a
//! server.

use crate::core::identifier::{qualify_mssql, quote_mssql, unicode_literal};
use crate::core::schema::{Column, ForeignKey, Index, IndexColumn, KeyConstraint, Table};
use crate::core::ObjectCategory;
use crate::error::Result;
use crate::policy::{ScriptOptions, TargetVersion};

/// Format a column type as T-SQL.
pub fn format_mssql_type(col: &Column) -> Result<String> {
    if let Some(schema) = &col.type_schema {
        return qualify_mssql(schema, &col.data_type);
    }

    let data_type = &col.data_type;
    let lower = data_type.to_lowercase();
    let formatted = match lower.as_str() {
        "decimal" | "numeric" => {
            if col.precision > 0 {
                format!("{}({}, {})", data_type, col.precision, col.scale)
            } else {
                format!("{}(18, 0)", data_type)
            }
        }
        "float" => {
            if col.precision > 0 && col.precision != 53 {
                format!("float({})", col.precision)
            } else {
                "float".to_string()
            }
        }
        "datetime2" | "time" | "datetimeoffset" => {
            if col.scale != 7 {
                format!("{}({})", data_type, col.scale)
            } else {
                data_type.to_string()
            }
        }
        "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" => {
            if col.max_length == -1 {
                format!("{}(max)", data_type)
            } else if col.max_length > 0 {
                format!("{}({})", data_type, col.max_length)
            } else {
                format!("{}(1)", data_type)
            }
        }
        _ => data_type.to_string(),
    };
    Ok(formatted)
}

/// `DROP` guarded for objects that may not exist, per target version.
pub fn drop_statement(
    category: ObjectCategory,
    qualified: &str,
    target: TargetVersion,
) -> Option<String> {
    let (keyword, type_code) = match category {
        ObjectCategory::Table => ("TABLE", "U"),
        ObjectCategory::View => ("VIEW", "V"),
        ObjectCategory::StoredProcedure => ("PROCEDURE", "P"),
        ObjectCategory::UserDefinedFunction => ("FUNCTION", ""),
        _ => return None,
    };

    if target.supports_drop_if_exists() {
        return Some(format!("DROP {} IF EXISTS {}", keyword, qualified));
    }

    let object_id = if type_code.is_empty() {
        format!("OBJECT_ID({})", unicode_literal(qualified))
    } else {
        format!(
            "OBJECT_ID({}, {})",
            unicode_literal(qualified),
            unicode_literal(type_code)
        )
    };
    Some(format!(
        "IF {} IS NOT NULL DROP {} {}",
        object_id, keyword, qualified
    ))
}

/// CREATE TABLE plus its out-of-line constraints and indexes.
pub fn create_table(table: &Table, options: &ScriptOptions) -> Result<Vec<String>> {
    let qualified = qualify_mssql(&table.schema, &table.name)?;
    let mut fragments = Vec::new();

    if options.drops {
        if let Some(drop) =
            drop_statement(ObjectCategory::Table, &qualified, options.target_version)
        {
            fragments.push(drop);
        }
    }
    fragments.push("SET ANSI_NULLS ON".to_string());
    fragments.push("SET QUOTED_IDENTIFIER ON".to_string());

    let mut lines = Vec::with_capacity(table.columns.len() + 2);
    for col in &table.columns {
        lines.push(format!("\t{}", column_definition(col)?));
    }
    if let Some(pk) = &table.primary_key {
        lines.push(format!("\t{}", key_constraint(pk, "PRIMARY KEY")?));
    }
    for uq in &table.unique_constraints {
        lines.push(format!("\t{}", key_constraint(uq, "UNIQUE")?));
    }

    let mut create = format!("CREATE TABLE {}(\n{}\n)", qualified, lines.join(",\n"));
    if let Some(partition) = &table.partition {
        create.push_str(&format!(
            " ON {}({})",
            quote_mssql(&partition.scheme)?,
            quote_mssql(&partition.column)?
        ));
    }
    fragments.push(create);

    if options.check_constraints {
        for check in &table.check_constraints {
            fragments.push(format!(
                "ALTER TABLE {} WITH CHECK ADD CONSTRAINT {} CHECK ({})",
                qualified,
                quote_mssql(&check.name)?,
                strip_outer_parens(&check.definition)
            ));
        }
    }

    if options.foreign_keys {
        for fk in &table.foreign_keys {
            fragments.push(foreign_key(&qualified, fk)?);
        }
    }

    if options.indexes {
        for index in &table.indexes {
            fragments.push(create_index(&qualified, index)?);
        }
    }

    Ok(fragments)
}

fn column_definition(col: &Column) -> Result<String> {
    let name = quote_mssql(&col.name)?;

    if let Some(computed) = &col.computed {
        let persisted = if computed.is_persisted { " PERSISTED" } else { "" };
        return Ok(format!("{} AS {}{}", name, computed.definition, persisted));
    }

    let mut def = format!("{} {}", name, format_mssql_type(col)?);
    if let Some(collation) = &col.collation {
        def.push_str(&format!(" COLLATE {}", collation));
    }
    if let Some(identity) = &col.identity {
        def.push_str(&format!(" IDENTITY({},{})", identity.seed, identity.increment));
    }
    def.push_str(if col.is_nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &col.default {
        def.push_str(&format!(
            " CONSTRAINT {} DEFAULT {}",
            quote_mssql(&default.name)?,
            default.definition
        ));
    }
    Ok(def)
}

fn key_constraint(key: &KeyConstraint, kind: &str) -> Result<String> {
    let clustering = if key.is_clustered { "CLUSTERED" } else { "NONCLUSTERED" };
    Ok(format!(
        "CONSTRAINT {} {} {} ({})",
        quote_mssql(&key.name)?,
        kind,
        clustering,
        index_columns(&key.columns)?
    ))
}

fn index_columns(columns: &[IndexColumn]) -> Result<String> {
    let cols: Result<Vec<String>> = columns
        .iter()
        .map(|c| {
            let direction = if c.descending { "DESC" } else { "ASC" };
            Ok(format!("{} {}", quote_mssql(&c.name)?, direction))
        })
        .collect();
    Ok(cols?.join(", "))
}

fn foreign_key(qualified: &str, fk: &ForeignKey) -> Result<String> {
    let cols: Result<Vec<String>> = fk.columns.iter().map(|c| quote_mssql(c)).collect();
    let ref_cols: Result<Vec<String>> = fk.ref_columns.iter().map(|c| quote_mssql(c)).collect();

    let mut sql = format!(
        "ALTER TABLE {} WITH CHECK ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        qualified,
        quote_mssql(&fk.name)?,
        cols?.join(", "),
        qualify_mssql(&fk.ref_schema, &fk.ref_table)?,
        ref_cols?.join(", ")
    );
    if let Some(action) = referential_action(&fk.on_delete) {
        sql.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = referential_action(&fk.on_update) {
        sql.push_str(&format!(" ON UPDATE {}", action));
    }
    Ok(sql)
}

/// Map `sys.foreign_keys` action descriptions; `NO_ACTION` is the default.
fn referential_action(desc: &str) -> Option<&'static str> {
    match desc.to_uppercase().as_str() {
        "CASCADE" => Some("CASCADE"),
        "SET_NULL" => Some("SET NULL"),
        "SET_DEFAULT" => Some("SET DEFAULT"),
        _ => None,
    }
}

fn create_index(qualified: &str, idx: &Index) -> Result<String> {
    let unique = if idx.is_unique { "UNIQUE " } else { "" };
    let clustering = if idx.is_clustered { "CLUSTERED" } else { "NONCLUSTERED" };

    let mut sql = format!(
        "CREATE {}{} INDEX {} ON {} ({})",
        unique,
        clustering,
        quote_mssql(&idx.name)?,
        qualified,
        index_columns(&idx.columns)?
    );

    if !idx.include_cols.is_empty() {
        let include: Result<Vec<String>> = idx.include_cols.iter().map(|c| quote_mssql(c)).collect();
        sql.push_str(&format!(" INCLUDE ({})", include?.join(", ")));
    }
    if let Some(filter) = &idx.filter {
        sql.push_str(&format!(" WHERE {}", strip_outer_parens(filter)));
    }
    Ok(sql)
}

/// View, procedure or function definition as stored in `sys.sql_modules`.
pub fn module_script(
    category: ObjectCategory,
    qualified: &str,
    definition: &str,
    ansi_nulls: bool,
    quoted_identifier: bool,
    options: &ScriptOptions,
) -> Vec<String> {
    let mut fragments = Vec::new();
    if options.drops {
        if let Some(drop) = drop_statement(category, qualified, options.target_version) {
            fragments.push(drop);
        }
    }
    fragments.push(format!("SET ANSI_NULLS {}", on_off(ansi_nulls)));
    fragments.push(format!("SET QUOTED_IDENTIFIER {}", on_off(quoted_identifier)));
    fragments.push(definition.trim().to_string());
    fragments
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

/// Parameter type and boundaries of a partition function.
#[derive(Debug, Clone)]
pub struct PartitionFunctionDef {
    pub name: String,
    pub range_right: bool,
    pub parameter: Column,
    pub boundaries: Vec<String>,
}

pub fn create_partition_function(
    def: &PartitionFunctionDef,
    options: &ScriptOptions,
) -> Result<Vec<String>> {
    let name = quote_mssql(&def.name)?;
    let mut fragments = Vec::new();
    if options.drops {
        fragments.push(format!(
            "IF EXISTS (SELECT 1 FROM sys.partition_functions WHERE name = {}) DROP PARTITION FUNCTION {}",
            unicode_literal(&def.name),
            name
        ));
    }

    let quoted_values = boundary_needs_quotes(&def.parameter.data_type);
    let values: Vec<String> = def
        .boundaries
        .iter()
        .map(|v| {
            if quoted_values {
                unicode_literal(v)
            } else {
                v.clone()
            }
        })
        .collect();

    fragments.push(format!(
        "CREATE PARTITION FUNCTION {}({}) AS RANGE {} FOR VALUES ({})",
        name,
        format_mssql_type(&def.parameter)?,
        if def.range_right { "RIGHT" } else { "LEFT" },
        values.join(", ")
    ));
    Ok(fragments)
}

fn boundary_needs_quotes(data_type: &str) -> bool {
    !matches!(
        data_type.to_lowercase().as_str(),
        "tinyint"
            | "smallint"
            | "int"
            | "bigint"
            | "decimal"
            | "numeric"
            | "real"
            | "float"
            | "money"
            | "smallmoney"
            | "bit"
    )
}

pub fn create_partition_scheme(
    name: &str,
    function: &str,
    filegroups: &[String],
    options: &ScriptOptions,
) -> Result<Vec<String>> {
    let quoted = quote_mssql(name)?;
    let mut fragments = Vec::new();
    if options.drops {
        fragments.push(format!(
            "IF EXISTS (SELECT 1 FROM sys.partition_schemes WHERE name = {}) DROP PARTITION SCHEME {}",
            unicode_literal(name),
            quoted
        ));
    }
    let groups: Result<Vec<String>> = filegroups.iter().map(|g| quote_mssql(g)).collect();
    fragments.push(format!(
        "CREATE PARTITION SCHEME {} AS PARTITION {} TO ({})",
        quoted,
        quote_mssql(function)?,
        groups?.join(", ")
    ));
    Ok(fragments)
}

/// Full-mode CREATE DATABASE: collation and compatibility level, the level
/// capped at what the target version understands.
pub fn create_database(
    name: &str,
    collation: Option<&str>,
    compatibility_level: u8,
    options: &ScriptOptions,
) -> Result<Vec<String>> {
    let quoted = quote_mssql(name)?;
    let mut create = format!("CREATE DATABASE {}", quoted);
    if let Some(collation) = collation {
        create.push_str(&format!(" COLLATE {}", collation));
    }

    let target = options.target_version;
    let level = compatibility_level.min(target.compatibility_level());
    let compat = if target >= TargetVersion::Sql2008 {
        format!("ALTER DATABASE {} SET COMPATIBILITY_LEVEL = {}", quoted, level)
    } else {
        format!(
            "EXEC dbo.sp_dbcmptlevel @dbname={}, @new_cmptlevel={}",
            unicode_literal(name),
            level
        )
    };

    Ok(vec![create, compat])
}

/// `((0))` -> `(0)`: catalog definitions carry one extra layer of parens.
fn strip_outer_parens(definition: &str) -> &str {
    let trimmed = definition.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') && balanced(&trimmed[1..trimmed.len() - 1]) {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{
        CheckConstraint, DefaultConstraint, Identity, PartitionPlacement,
    };

    fn col(name: &str, data_type: &str, max_length: i32, precision: i32, scale: i32) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length,
            precision,
            scale,
            ..Column::default()
        }
    }

    fn orders() -> Table {
        let mut id = col("Id", "int", 4, 10, 0);
        id.identity = Some(Identity { seed: 1, increment: 1 });
        let mut status = col("Status", "nvarchar", 20, 0, 0);
        status.default = Some(DefaultConstraint {
            name: "DF_Orders_Status".into(),
            definition: "(N'new')".into(),
        });
        let mut customer = col("CustomerId", "int", 4, 10, 0);
        customer.is_nullable = true;

        Table {
            schema: "dbo".into(),
            name: "Orders".into(),
            columns: vec![id, customer, status],
            primary_key: Some(KeyConstraint {
                name: "PK_Orders".into(),
                columns: vec![IndexColumn {
                    name: "Id".into(),
                    descending: false,
                }],
                is_clustered: true,
            }),
            foreign_keys: vec![ForeignKey {
                name: "FK_Orders_Customers".into(),
                columns: vec!["CustomerId".into()],
                ref_table: "Customers".into(),
                ref_schema: "dbo".into(),
                ref_columns: vec!["Id".into()],
                on_delete: "CASCADE".into(),
                on_update: "NO_ACTION".into(),
            }],
            check_constraints: vec![CheckConstraint {
                name: "CK_Orders_Status".into(),
                definition: "([Status]<>N'')".into(),
            }],
            ..Table::default()
        }
    }

    #[test]
    fn test_format_mssql_type() {
        assert_eq!(format_mssql_type(&col("a", "nvarchar", -1, 0, 0)).unwrap(), "nvarchar(max)");
        assert_eq!(format_mssql_type(&col("a", "varchar", 50, 0, 0)).unwrap(), "varchar(50)");
        assert_eq!(format_mssql_type(&col("a", "decimal", 0, 10, 2)).unwrap(), "decimal(10, 2)");
        assert_eq!(format_mssql_type(&col("a", "datetime2", 8, 27, 7)).unwrap(), "datetime2");
        assert_eq!(format_mssql_type(&col("a", "datetime2", 6, 23, 3)).unwrap(), "datetime2(3)");
        assert_eq!(format_mssql_type(&col("a", "float", 8, 53, 0)).unwrap(), "float");
        assert_eq!(format_mssql_type(&col("a", "int", 4, 10, 0)).unwrap(), "int");

        let mut udt = col("a", "Phone", 20, 0, 0);
        udt.type_schema = Some("dbo".into());
        assert_eq!(format_mssql_type(&udt).unwrap(), "[dbo].[Phone]");
    }

    #[test]
    fn test_create_table_fragments() {
        let fragments = create_table(&orders(), &ScriptOptions::default()).unwrap();
        assert_eq!(fragments[0], "SET ANSI_NULLS ON");
        assert_eq!(fragments[1], "SET QUOTED_IDENTIFIER ON");
        assert_eq!(
            fragments[2],
            "CREATE TABLE [dbo].[Orders](\n\
             \t[Id] int IDENTITY(1,1) NOT NULL,\n\
             \t[CustomerId] int NULL,\n\
             \t[Status] nvarchar(20) NOT NULL CONSTRAINT [DF_Orders_Status] DEFAULT (N'new'),\n\
             \tCONSTRAINT [PK_Orders] PRIMARY KEY CLUSTERED ([Id] ASC)\n)"
        );
        assert_eq!(
            fragments[3],
            "ALTER TABLE [dbo].[Orders] WITH CHECK ADD CONSTRAINT [CK_Orders_Status] CHECK ([Status]<>N'')"
        );
        assert_eq!(
            fragments[4],
            "ALTER TABLE [dbo].[Orders] WITH CHECK ADD CONSTRAINT [FK_Orders_Customers] \
             FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customers] ([Id]) ON DELETE CASCADE"
        );
        assert_eq!(fragments.len(), 5);
    }

    #[test]
    fn test_create_table_honors_options() {
        let options = ScriptOptions {
            foreign_keys: false,
            check_constraints: false,
            drops: true,
            target_version: TargetVersion::Sql2012,
            ..ScriptOptions::default()
        };
        let mut table = orders();
        table.partition = Some(PartitionPlacement {
            scheme: "psByYear".into(),
            column: "Id".into(),
        });
        let fragments = create_table(&table, &options).unwrap();
        assert_eq!(
            fragments[0],
            "IF OBJECT_ID(N'[dbo].[Orders]', N'U') IS NOT NULL DROP TABLE [dbo].[Orders]"
        );
        assert!(fragments[3].ends_with(") ON [psByYear]([Id])"));
        assert_eq!(fragments.len(), 4);
    }

    #[test]
    fn test_drop_statement_by_version() {
        assert_eq!(
            drop_statement(ObjectCategory::View, "[dbo].[V]", TargetVersion::Sql2016).unwrap(),
            "DROP VIEW IF EXISTS [dbo].[V]"
        );
        assert_eq!(
            drop_statement(ObjectCategory::UserDefinedFunction, "[dbo].[F]", TargetVersion::Sql2008)
                .unwrap(),
            "IF OBJECT_ID(N'[dbo].[F]') IS NOT NULL DROP FUNCTION [dbo].[F]"
        );
        assert!(drop_statement(ObjectCategory::PartitionScheme, "[ps]", TargetVersion::Sql2019).is_none());
    }

    #[test]
    fn test_index_rendering() {
        let idx = Index {
            name: "IX_Orders_Status".into(),
            columns: vec![IndexColumn {
                name: "Status".into(),
                descending: true,
            }],
            is_unique: true,
            is_clustered: false,
            include_cols: vec!["CustomerId".into()],
            filter: Some("([Status] IS NOT NULL)".into()),
        };
        assert_eq!(
            create_index("[dbo].[Orders]", &idx).unwrap(),
            "CREATE UNIQUE NONCLUSTERED INDEX [IX_Orders_Status] ON [dbo].[Orders] ([Status] DESC) \
             INCLUDE ([CustomerId]) WHERE [Status] IS NOT NULL"
        );
    }

    #[test]
    fn test_partition_objects() {
        let def = PartitionFunctionDef {
            name: "pfByDate".into(),
            range_right: true,
            parameter: col("", "date", 3, 10, 0),
            boundaries: vec!["2023-01-01".into(), "2024-01-01".into()],
        };
        let options = ScriptOptions::default();
        assert_eq!(
            create_partition_function(&def, &options).unwrap(),
            vec!["CREATE PARTITION FUNCTION [pfByDate](date) AS RANGE RIGHT FOR VALUES (N'2023-01-01', N'2024-01-01')"]
        );
        assert_eq!(
            create_partition_scheme(
                "psByDate",
                "pfByDate",
                &["PRIMARY".to_string(), "FG2".to_string()],
                &options
            )
            .unwrap(),
            vec!["CREATE PARTITION SCHEME [psByDate] AS PARTITION [pfByDate] TO ([PRIMARY], [FG2])"]
        );
    }

    #[test]
    fn test_create_database_caps_level() {
        let options = ScriptOptions {
            target_version: TargetVersion::Sql2012,
            ..ScriptOptions::default()
        };
        let fragments =
            create_database("Sales", Some("Latin1_General_CI_AS"), 150, &options).unwrap();
        assert_eq!(
            fragments,
            vec![
                "CREATE DATABASE [Sales] COLLATE Latin1_General_CI_AS",
                "ALTER DATABASE [Sales] SET COMPATIBILITY_LEVEL = 110",
            ]
        );

        let legacy = ScriptOptions {
            target_version: TargetVersion::Sql2000,
            ..ScriptOptions::default()
        };
        let fragments = create_database("Old", None, 80, &legacy).unwrap();
        assert_eq!(
            fragments[1],
            "EXEC dbo.sp_dbcmptlevel @dbname=N'Old', @new_cmptlevel=80"
        );
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens("((0))"), "(0)");
        assert_eq!(strip_outer_parens("([a]>(0))"), "[a]>(0)");
        assert_eq!(strip_outer_parens("(a) OR (b)"), "(a) OR (b)");
    }
}
