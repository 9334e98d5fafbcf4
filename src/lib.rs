//! pgscan - PostgreSQL table scan activity library.
//!
//! Samples `pg_stat_all_tables` and reports, per table, the cumulative
//! sequential scan counters together with their change since the previous
//! sample.
//!
//! - `scanner` — init/scan protocol, session handling, statistics read
//! - `delta` — baseline and delta computation
//! - `model` — counter types (big integers, decimal-string serde)
//! - `filter` — caller-supplied table predicate
//! - `config` — connection parameters
//! - `error` — error taxonomy
//!
//! ```no_run
//! use pgscan::{Config, Scanner, TableFilter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let filter = TableFilter::excluding(["public.ignore_me"]);
//! let mut scanner = Scanner::with_filter(Config::from_env()?, filter);
//! scanner.init().await?;
//! let stats = scanner.scan().await?;
//! println!("{}", serde_json::to_string(&stats)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delta;
pub mod error;
pub mod filter;
pub mod model;
pub mod scanner;

pub use config::{Config, ConfigError, Target};
pub use error::{ErrorKind, ScanError};
pub use filter::TableFilter;
pub use model::{AugmentedTableCounters, RawTableCounters, Stats};
pub use scanner::{Scanner, ScannerState};
