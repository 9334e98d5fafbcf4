//! Table counter models.
//!
//! Counters are cumulative values maintained by PostgreSQL and can exceed the
//! exact integer range of a double, so they are kept as big integers and
//! serialized as decimal strings.

use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

/// Absolute counters for one table at the time of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableCounters {
    /// Source: `pg_stat_all_tables.schemaname`
    pub schema: String,

    /// Source: `pg_stat_all_tables.relname`
    pub table: String,

    /// Sequential scans initiated (cumulative).
    /// Source: `pg_stat_all_tables.seq_scan`
    #[serde(with = "decimal")]
    pub sequential_scans: BigUint,

    /// Rows returned by sequential scans (cumulative).
    /// Source: `pg_stat_all_tables.seq_tup_read`
    #[serde(with = "decimal")]
    pub rows_scanned: BigUint,
}

impl RawTableCounters {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        sequential_scans: impl Into<BigUint>,
        rows_scanned: impl Into<BigUint>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            sequential_scans: sequential_scans.into(),
            rows_scanned: rows_scanned.into(),
        }
    }

    /// Baseline lookup key.
    pub fn key(&self) -> (&str, &str) {
        (&self.schema, &self.table)
    }
}

/// Absolute counters plus the change since the previous cycle.
///
/// Deltas are negative when the server counters were reset between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentedTableCounters {
    #[serde(flatten)]
    pub counters: RawTableCounters,

    #[serde(with = "decimal")]
    pub sequential_scans_delta: BigInt,

    #[serde(with = "decimal")]
    pub rows_scanned_delta: BigInt,
}

impl AugmentedTableCounters {
    pub fn schema(&self) -> &str {
        &self.counters.schema
    }

    pub fn table(&self) -> &str {
        &self.counters.table
    }

    pub fn sequential_scans(&self) -> &BigUint {
        &self.counters.sequential_scans
    }

    pub fn rows_scanned(&self) -> &BigUint {
        &self.counters.rows_scanned
    }
}

/// Result of one `scan()` cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub tables: Vec<AugmentedTableCounters>,
}

/// Decimal-string (de)serialization for big integers.
mod decimal {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
