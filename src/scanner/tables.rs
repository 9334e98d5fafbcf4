//! Reader for pg_stat_all_tables.

use num_bigint::BigUint;
use tracing::trace;

use super::queries::{build_stat_all_tables_query, is_system_schema};
use super::session::{Session, StatRow};
use crate::error::BoxError;
use crate::filter::TableFilter;
use crate::model::RawTableCounters;

/// Reads absolute counters for every visible table.
///
/// Rows in system schemas are dropped first, then rows rejected by
/// `filter`. Server ordering (schema, then table) is preserved.
pub(crate) async fn read_tables<S: Session>(
    session: &mut S,
    filter: &TableFilter,
) -> Result<Vec<RawTableCounters>, BoxError> {
    let rows = session.query_stats(build_stat_all_tables_query()).await?;
    let total = rows.len();

    let tables = rows
        .into_iter()
        .filter(|row| !is_system_schema(&row.schemaname))
        .filter(|row| filter.allows(&row.schemaname, &row.relname))
        .map(normalize_row)
        .collect::<Result<Vec<_>, _>>()?;

    trace!(total, visible = tables.len(), "pg_stat_all_tables read");
    Ok(tables)
}

fn normalize_row(row: StatRow) -> Result<RawTableCounters, BoxError> {
    let sequential_scans = parse_counter(&row, "seq_scan", &row.seq_scan)?;
    let rows_scanned = parse_counter(&row, "seq_tup_read", &row.seq_tup_read)?;
    Ok(RawTableCounters {
        schema: row.schemaname,
        table: row.relname,
        sequential_scans,
        rows_scanned,
    })
}

fn parse_counter(row: &StatRow, column: &str, raw: &str) -> Result<BigUint, BoxError> {
    raw.trim().parse::<BigUint>().map_err(|e| {
        format!(
            "invalid {} value '{}' for {}.{}: {}",
            column, raw, row.schemaname, row.relname, e
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scanner::mock::{MockConnector, row};
    use crate::scanner::session::Connector;

    async fn read_with(
        rows: Vec<StatRow>,
        filter: &TableFilter,
    ) -> Result<Vec<RawTableCounters>, BoxError> {
        let connector = MockConnector::new();
        connector.push_rows(rows);
        let mut session = connector
            .connect(&Config::new("localhost", 5432, "postgres", "postgres"))
            .await?;
        read_tables(&mut session, filter).await
    }

    #[tokio::test]
    async fn drops_system_schemas() {
        let tables = read_with(
            vec![
                row("information_schema", "sql_features", 4, 700),
                row("pg_catalog", "pg_class", 10, 4000),
                row("pg_toast", "pg_toast_2619", 0, 0),
                row("public", "orders", 3, 30),
            ],
            &TableFilter::accept_all(),
        )
        .await
        .unwrap();

        assert_eq!(tables, vec![RawTableCounters::new("public", "orders", 3u64, 30u64)]);
    }

    #[tokio::test]
    async fn applies_caller_filter_after_system_schemas() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = seen.clone();
        let filter = TableFilter::new(move |schema, table| {
            log.lock().unwrap().push(format!("{}.{}", schema, table));
            table != "t2"
        });

        let tables = read_with(
            vec![
                row("pg_catalog", "pg_class", 1, 1),
                row("public", "t1", 1, 1),
                row("public", "t2", 1, 1),
            ],
            &filter,
        )
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["t1"]);
        // Predicate runs once per non-system row.
        assert_eq!(*seen.lock().unwrap(), vec!["public.t1", "public.t2"]);
    }

    #[tokio::test]
    async fn keeps_counters_beyond_f64_precision() {
        let mut big = row("public", "events", 0, 0);
        big.seq_tup_read = "123456789012345678901234567890".to_string();

        let tables = read_with(vec![big], &TableFilter::accept_all()).await.unwrap();
        assert_eq!(
            tables[0].rows_scanned.to_string(),
            "123456789012345678901234567890"
        );
    }

    #[tokio::test]
    async fn malformed_counter_fails_the_read() {
        let mut bad = row("public", "orders", 0, 0);
        bad.seq_scan = "-1".to_string();

        let err = read_with(vec![bad], &TableFilter::accept_all())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid seq_scan value '-1' for public.orders"));
    }
}
