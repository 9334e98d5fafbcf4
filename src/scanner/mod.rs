//! Differential table statistics scanner.
//!
//! ## Protocol
//!
//! A [`Scanner`] starts `Uninitialised`. `init()` runs one cycle to record
//! the baseline and moves it to `Initialised`; only then is `scan()`
//! accepted. There is no way back.
//!
//! ## Cycle
//!
//! ```text
//! connect ─► read pg_stat_all_tables ─► drop system schemas ─► filter
//!         ─► diff against baseline ─► replace baseline ─► close
//! ```
//!
//! A failed cycle leaves the baseline and state untouched. The session is
//! closed on every path once it was opened.
//!
//! `init` and `scan` borrow the scanner mutably, so cycles of one scanner
//! never overlap.

pub mod mock;
mod queries;
pub mod session;
mod tables;

use tracing::{debug, info};

use crate::config::Config;
use crate::delta::Baseline;
use crate::error::ScanError;
use crate::filter::TableFilter;
use crate::model::{AugmentedTableCounters, Stats};
use session::{Connector, PgConnector, with_session};

pub use queries::SYSTEM_SCHEMAS;

/// Protocol state of a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannerState {
    #[default]
    Uninitialised,
    Initialised,
}

/// Reports per-table sequential scan counters and their change between calls.
pub struct Scanner<C = PgConnector> {
    config: Config,
    filter: TableFilter,
    connector: C,
    state: ScannerState,
    baseline: Baseline,
}

impl Scanner<PgConnector> {
    /// Creates a scanner that reports every non-system table.
    ///
    /// `init` and `scan` spawn the connection driver onto the current Tokio
    /// runtime and panic when awaited outside one.
    pub fn new(config: Config) -> Self {
        Self::with_filter(config, TableFilter::accept_all())
    }

    /// Creates a scanner that reports only tables accepted by `filter`.
    ///
    /// Like [`Scanner::new`], cycles must run inside a Tokio runtime.
    pub fn with_filter(config: Config, filter: TableFilter) -> Self {
        Self::with_connector(config, filter, PgConnector::new())
    }
}

impl<C: Connector> Scanner<C> {
    /// Creates a scanner using a custom session source.
    pub fn with_connector(config: Config, filter: TableFilter, connector: C) -> Self {
        Self {
            config,
            filter,
            connector,
            state: ScannerState::Uninitialised,
            baseline: Baseline::new(),
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn is_initialised(&self) -> bool {
        self.state == ScannerState::Initialised
    }

    /// Records the initial baseline.
    ///
    /// Fails with [`ScanError::AlreadyInitialised`] without any I/O if called
    /// twice. On a session failure the scanner stays uninitialised and `init`
    /// may be retried.
    pub async fn init(&mut self) -> Result<(), ScanError> {
        if self.is_initialised() {
            return Err(ScanError::AlreadyInitialised);
        }

        let tables = self.run_cycle().await?;
        self.state = ScannerState::Initialised;
        info!(
            target_db = %self.config.target(),
            tables = tables.len(),
            "scanner initialised"
        );
        Ok(())
    }

    /// Reads current counters and returns them with deltas since the last
    /// successful cycle.
    ///
    /// Fails with [`ScanError::NotInitialised`] without any I/O before
    /// `init()` succeeded.
    pub async fn scan(&mut self) -> Result<Stats, ScanError> {
        if !self.is_initialised() {
            return Err(ScanError::NotInitialised);
        }

        let tables = self.run_cycle().await?;
        debug!(tables = tables.len(), "scan complete");
        Ok(Stats { tables })
    }

    async fn run_cycle(&mut self) -> Result<Vec<AugmentedTableCounters>, ScanError> {
        let config = &self.config;
        let filter = &self.filter;
        let baseline = &mut self.baseline;

        with_session(
            &self.connector,
            config,
            async |session: &mut C::Session| {
                let current = tables::read_tables(session, filter)
                    .await
                    .map_err(|source| ScanError::query(config.target(), source))?;
                Ok::<_, ScanError>(baseline.advance(current))
            },
        )
        .await
    }
}
