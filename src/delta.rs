//! Delta computation between successive counter snapshots.
//!
//! The baseline holds the augmented result of the last completed cycle.
//! A new raw read is diffed against it and then replaces it wholesale, so
//! tables missing from a read are forgotten and come back as new.

use std::collections::HashMap;

use num_bigint::{BigInt, BigUint, Sign};
use tracing::debug;

use crate::model::{AugmentedTableCounters, RawTableCounters};

/// Signed difference between two absolute counter values.
///
/// Not clamped: a negative result means the counter was reset.
pub fn delta(curr: &BigUint, prev: &BigUint) -> BigInt {
    BigInt::from(curr.clone()) - BigInt::from(prev.clone())
}

/// Previous snapshot used as the subtrahend for the next cycle.
#[derive(Debug, Default, Clone)]
pub struct Baseline {
    tables: Vec<AugmentedTableCounters>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Augments `current` with deltas against this baseline.
    ///
    /// Output order follows `current`. Tables absent from the baseline get a
    /// zero baseline, so their deltas equal their absolute values.
    pub fn diff(&self, current: Vec<RawTableCounters>) -> Vec<AugmentedTableCounters> {
        let prev_sample: HashMap<(&str, &str), &RawTableCounters> = self
            .tables
            .iter()
            .map(|t| (t.counters.key(), &t.counters))
            .collect();
        let zero = BigUint::default();

        current
            .into_iter()
            .map(|counters| {
                let (prev_scans, prev_rows) = match prev_sample.get(&counters.key()) {
                    Some(prev) => (&prev.sequential_scans, &prev.rows_scanned),
                    None => (&zero, &zero),
                };
                let sequential_scans_delta = delta(&counters.sequential_scans, prev_scans);
                let rows_scanned_delta = delta(&counters.rows_scanned, prev_rows);

                if sequential_scans_delta.sign() == Sign::Minus
                    || rows_scanned_delta.sign() == Sign::Minus
                {
                    debug!(
                        schema = %counters.schema,
                        table = %counters.table,
                        "counter regression, statistics were likely reset"
                    );
                }

                AugmentedTableCounters {
                    counters,
                    sequential_scans_delta,
                    rows_scanned_delta,
                }
            })
            .collect()
    }

    /// Replaces the baseline with a completed cycle's result.
    pub fn replace(&mut self, tables: Vec<AugmentedTableCounters>) {
        self.tables = tables;
    }

    /// Diffs `current` and makes the result the new baseline.
    pub fn advance(&mut self, current: Vec<RawTableCounters>) -> Vec<AugmentedTableCounters> {
        let next = self.diff(current);
        self.replace(next.clone());
        next
    }

    pub fn tables(&self) -> &[AugmentedTableCounters] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
