//! Catalog queries.
//!
//! Database-scoped queries use three-part names (`[Sales].sys.tables`) so
//! one connection can walk every database without switching context. The
//! `{db}` marker is replaced with the bracket-quoted database name.

/// Replace the `{db}` marker with a quoted database name.
pub fn in_database(sql: &str, quoted_db: &str) -> String {
    sql.replace("{db}", quoted_db)
}

pub const SERVER_NAME: &str =
    "SELECT CAST(COALESCE(@@SERVERNAME, SERVERPROPERTY('ServerName')) AS NVARCHAR(128))";

pub const DATABASES: &str = r#"
    SELECT
        d.name,
        d.compatibility_level,
        CAST(CASE WHEN d.database_id <= 4 OR d.is_distributor = 1 THEN 1 ELSE 0 END AS BIT)
    FROM sys.databases d
    WHERE d.state = 0
    ORDER BY d.name
"#;

pub const DATABASE_OPTIONS: &str = r#"
    SELECT d.collation_name, d.compatibility_level
    FROM sys.databases d
    WHERE d.name = @P1
"#;

/// Schema-scoped objects. `is_system` covers both shipped objects and the
/// designer objects tagged by SSMS (`sysdiagrams`, `sp_helpdiagrams`, ...).
pub const OBJECTS: &str = r#"
    SELECT
        RTRIM(o.type),
        o.object_id,
        s.name,
        o.name,
        CAST(CASE WHEN o.is_ms_shipped = 1 OR ep.major_id IS NOT NULL THEN 1 ELSE 0 END AS BIT)
    FROM {db}.sys.objects o
    JOIN {db}.sys.schemas s ON s.schema_id = o.schema_id
    LEFT JOIN {db}.sys.extended_properties ep
        ON ep.class = 1
        AND ep.major_id = o.object_id
        AND ep.minor_id = 0
        AND ep.name = N'microsoft_database_tools_support'
    WHERE o.type IN ('U', 'V', 'P', 'FN', 'IF', 'TF')
    ORDER BY s.name, o.name
"#;

pub const PARTITION_FUNCTIONS: &str = r#"
    SELECT pf.function_id, pf.name
    FROM {db}.sys.partition_functions pf
    ORDER BY pf.name
"#;

pub const PARTITION_SCHEMES: &str = r#"
    SELECT ps.data_space_id, ps.name, ps.function_id
    FROM {db}.sys.partition_schemes ps
    ORDER BY ps.name
"#;

pub const FOREIGN_KEY_EDGES: &str = r#"
    SELECT DISTINCT fk.parent_object_id, fk.referenced_object_id
    FROM {db}.sys.foreign_keys fk
"#;

pub const EXPRESSION_EDGES: &str = r#"
    SELECT DISTINCT d.referencing_id, d.referenced_id
    FROM {db}.sys.sql_expression_dependencies d
    WHERE d.referencing_class = 1
      AND d.referenced_class = 1
      AND d.referenced_id IS NOT NULL
      AND d.referenced_server_name IS NULL
      AND d.referenced_database_name IS NULL
"#;

pub const PARTITION_PLACEMENT_EDGES: &str = r#"
    SELECT DISTINCT i.object_id, i.data_space_id
    FROM {db}.sys.indexes i
    JOIN {db}.sys.partition_schemes ps ON ps.data_space_id = i.data_space_id
    JOIN {db}.sys.tables t ON t.object_id = i.object_id
"#;

pub const COLUMNS: &str = r#"
    SELECT
        c.name,
        ty.name,
        CASE WHEN ty.is_user_defined = 1 THEN ts.name ELSE NULL END,
        CASE WHEN ty.is_user_defined = 1 THEN TYPE_NAME(ty.system_type_id) ELSE NULL END,
        CAST(CASE
            WHEN c.max_length = -1 THEN -1
            WHEN ty.name IN ('nchar', 'nvarchar') THEN c.max_length / 2
            ELSE c.max_length
        END AS INT),
        CAST(c.precision AS INT),
        CAST(c.scale AS INT),
        c.is_nullable,
        CAST(ic.seed_value AS BIGINT),
        CAST(ic.increment_value AS BIGINT),
        cc.definition,
        CAST(ISNULL(cc.is_persisted, 0) AS BIT),
        dc.name,
        dc.definition,
        CASE WHEN c.collation_name <> CAST(DATABASEPROPERTYEX(@P2, 'Collation') AS NVARCHAR(128))
             THEN c.collation_name ELSE NULL END
    FROM {db}.sys.columns c
    JOIN {db}.sys.types ty ON ty.user_type_id = c.user_type_id
    JOIN {db}.sys.schemas ts ON ts.schema_id = ty.schema_id
    LEFT JOIN {db}.sys.identity_columns ic
        ON ic.object_id = c.object_id AND ic.column_id = c.column_id
    LEFT JOIN {db}.sys.computed_columns cc
        ON cc.object_id = c.object_id AND cc.column_id = c.column_id
    LEFT JOIN {db}.sys.default_constraints dc
        ON dc.parent_object_id = c.object_id AND dc.parent_column_id = c.column_id
    WHERE c.object_id = @P1
    ORDER BY c.column_id
"#;

pub const TABLE_NAME: &str = r#"
    SELECT s.name, t.name
    FROM {db}.sys.tables t
    JOIN {db}.sys.schemas s ON s.schema_id = t.schema_id
    WHERE t.object_id = @P1
"#;

/// Key constraints and indexes, one row per key or included column.
pub const INDEXES: &str = r#"
    SELECT
        i.index_id,
        i.name,
        i.is_primary_key,
        i.is_unique_constraint,
        i.is_unique,
        CAST(CASE WHEN i.type = 1 THEN 1 ELSE 0 END AS BIT),
        i.filter_definition,
        c.name,
        ic.is_descending_key,
        ic.is_included_column
    FROM {db}.sys.indexes i
    JOIN {db}.sys.index_columns ic
        ON ic.object_id = i.object_id AND ic.index_id = i.index_id
    JOIN {db}.sys.columns c
        ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE i.object_id = @P1
      AND i.type IN (1, 2)
      AND i.is_hypothetical = 0
    ORDER BY i.index_id, ic.is_included_column, ic.key_ordinal, ic.index_column_id
"#;

pub const FOREIGN_KEYS: &str = r#"
    SELECT
        fk.object_id,
        fk.name,
        pc.name,
        rs.name,
        rt.name,
        rc.name,
        fk.delete_referential_action_desc,
        fk.update_referential_action_desc
    FROM {db}.sys.foreign_keys fk
    JOIN {db}.sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN {db}.sys.columns pc
        ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    JOIN {db}.sys.tables rt ON rt.object_id = fk.referenced_object_id
    JOIN {db}.sys.schemas rs ON rs.schema_id = rt.schema_id
    JOIN {db}.sys.columns rc
        ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE fk.parent_object_id = @P1
    ORDER BY fk.name, fkc.constraint_column_id
"#;

pub const CHECK_CONSTRAINTS: &str = r#"
    SELECT cc.name, cc.definition
    FROM {db}.sys.check_constraints cc
    WHERE cc.parent_object_id = @P1
      AND cc.is_disabled = 0
    ORDER BY cc.name
"#;

pub const TABLE_PARTITION: &str = r#"
    SELECT TOP 1 ps.name, c.name
    FROM {db}.sys.indexes i
    JOIN {db}.sys.partition_schemes ps ON ps.data_space_id = i.data_space_id
    JOIN {db}.sys.index_columns ic
        ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.partition_ordinal = 1
    JOIN {db}.sys.columns c
        ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE i.object_id = @P1 AND i.index_id IN (0, 1)
"#;

pub const MODULE: &str = r#"
    SELECT m.definition, m.uses_ansi_nulls, m.uses_quoted_identifier
    FROM {db}.sys.sql_modules m
    WHERE m.object_id = @P1
"#;

pub const PARTITION_FUNCTION: &str = r#"
    SELECT
        pf.name,
        pf.boundary_value_on_right,
        ty.name,
        CAST(pp.max_length AS INT),
        CAST(pp.precision AS INT),
        CAST(pp.scale AS INT)
    FROM {db}.sys.partition_functions pf
    JOIN {db}.sys.partition_parameters pp ON pp.function_id = pf.function_id
    JOIN {db}.sys.types ty ON ty.user_type_id = pp.user_type_id
    WHERE pf.function_id = @P1
"#;

pub const PARTITION_BOUNDARIES: &str = r#"
    SELECT CONVERT(NVARCHAR(4000), rv.value, 121)
    FROM {db}.sys.partition_range_values rv
    WHERE rv.function_id = @P1
    ORDER BY rv.boundary_id
"#;

pub const PARTITION_SCHEME: &str = r#"
    SELECT ps.name, pf.name, fg.name
    FROM {db}.sys.partition_schemes ps
    JOIN {db}.sys.partition_functions pf ON pf.function_id = ps.function_id
    JOIN {db}.sys.destination_data_spaces dds ON dds.partition_scheme_id = ps.data_space_id
    JOIN {db}.sys.filegroups fg ON fg.data_space_id = dds.data_space_id
    WHERE ps.data_space_id = @P1
    ORDER BY dds.destination_id
"#;
