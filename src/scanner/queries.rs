//! SQL for the per-table activity statistics read.

/// Schemas that never appear in results.
pub const SYSTEM_SCHEMAS: [&str; 3] = ["pg_catalog", "pg_toast", "information_schema"];

/// Builds the query for pg_stat_all_tables.
///
/// Counters are cast to text so they reach the client without passing
/// through a fixed-width integer.
pub(crate) fn build_stat_all_tables_query() -> &'static str {
    r#"
        SELECT
            schemaname::text AS schemaname,
            relname::text AS relname,
            COALESCE(seq_scan, 0)::text AS seq_scan,
            COALESCE(seq_tup_read, 0)::text AS seq_tup_read
        FROM pg_stat_all_tables
        ORDER BY schemaname ASC, relname ASC
    "#
}

pub(crate) fn is_system_schema(schema: &str) -> bool {
    SYSTEM_SCHEMAS.contains(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_schemas_are_excluded() {
        assert!(is_system_schema("pg_catalog"));
        assert!(is_system_schema("pg_toast"));
        assert!(is_system_schema("information_schema"));
        assert!(!is_system_schema("public"));
        assert!(!is_system_schema("pg_temp_3"));
    }

    #[test]
    fn query_is_ordered_by_schema_then_relation() {
        let sql = build_stat_all_tables_query();
        assert!(sql.contains("FROM pg_stat_all_tables"));
        assert!(sql.contains("ORDER BY schemaname ASC, relname ASC"));
    }
}
