//! pgscand - table scan activity poller.
//!
//! Records a baseline, then prints one JSON line per interval with the
//! sequential scan counters of every visible table and their deltas.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pgscan::{AugmentedTableCounters, Config, ConfigError, Scanner, TableFilter};

/// Table scan activity poller.
#[derive(Parser)]
#[command(name = "pgscand", about = "PostgreSQL table scan activity poller", version)]
struct Args {
    /// Polling interval in seconds.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Server host. Defaults to $PGHOST, then localhost.
    #[arg(long)]
    host: Option<String>,

    /// Server port. Defaults to $PGPORT, then 5432.
    #[arg(long)]
    port: Option<u16>,

    /// Database name. Defaults to $PGDATABASE, then the user name.
    #[arg(long)]
    dbname: Option<String>,

    /// User name. Defaults to $PGUSER, then $USER.
    #[arg(long)]
    user: Option<String>,

    /// Table to leave out, as SCHEMA.TABLE. May be repeated.
    #[arg(long, value_name = "SCHEMA.TABLE")]
    exclude: Vec<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One output line.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    collected_at: String,
    tables: &'a [AugmentedTableCounters],
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for crate_name in ["pgscand", "pgscan"] {
        if let Ok(directive) = format!("{}={}", crate_name, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the connection config, with arguments taking precedence over `env`.
fn build_config(
    args: &Args,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let config = Config::from_lookup(|key| {
        let arg = match key {
            "PGHOST" => args.host.clone(),
            "PGPORT" => args.port.map(|p| p.to_string()),
            "PGDATABASE" => args.dbname.clone(),
            "PGUSER" => args.user.clone(),
            _ => None,
        };
        arg.or_else(|| env(key))
    })?;
    Ok(config.with_application_name("pgscand"))
}

/// Sleeps for `interval`, waking early on shutdown.
async fn sleep_interruptible(interval: Duration, running: &AtomicBool) {
    let sleep_interval = Duration::from_millis(100);
    let mut remaining = interval;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(sleep_interval);
        tokio::time::sleep(sleep_time).await;
        remaining = remaining.saturating_sub(sleep_time);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = match build_config(&args, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    info!("pgscand {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, target={}, excluded={}",
        args.interval,
        config.target(),
        args.exclude.len()
    );

    let filter = if args.exclude.is_empty() {
        TableFilter::accept_all()
    } else {
        TableFilter::excluding(args.exclude.iter().cloned())
    };
    let mut scanner = Scanner::with_filter(config, filter);
    let interval = Duration::from_secs(args.interval);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut scan_count: u64 = 0;

    while running.load(Ordering::SeqCst) {
        if !scanner.is_initialised() {
            match scanner.init().await {
                Ok(()) => info!("Baseline recorded, polling every {}s", args.interval),
                Err(e) => error!("Initialisation failed ({}): {}", e.code(), e),
            }
        } else {
            match scanner.scan().await {
                Ok(stats) => {
                    scan_count += 1;
                    let report = Report {
                        collected_at: Utc::now().to_rfc3339(),
                        tables: &stats.tables,
                    };
                    match serde_json::to_string(&report) {
                        Ok(line) => println!("{}", line),
                        Err(e) => error!("Failed to serialize scan #{}: {}", scan_count, e),
                    }
                    debug!("Scan #{}: {} tables", scan_count, stats.tables.len());
                }
                Err(e) => error!("Scan failed ({}): {}", e.code(), e),
            }
        }

        sleep_interruptible(interval, &running).await;
    }

    info!("Shutdown complete after {} scans", scan_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn build_config_defaults_database_to_user() {
        let args = Args::parse_from(["pgscand", "--user", "reporter", "--port", "6432"]);
        let config = build_config(&args, env_from(&[])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.user, "reporter");
        assert_eq!(config.database, "reporter");
        assert_eq!(config.port, 6432);
        assert_eq!(config.application_name, "pgscand");
    }

    #[test]
    fn arguments_override_environment() {
        let env = env_from(&[
            ("USER", "alice"),
            ("PGHOST", "db.internal"),
            ("PGDATABASE", "orders"),
            ("PGPASSWORD", "hunter2"),
        ]);

        let config = build_config(&Args::parse_from(["pgscand"]), &env).unwrap();
        assert_eq!(config.user, "alice");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.database, "orders");
        assert_eq!(config.password.as_deref(), Some("hunter2"));

        let args = Args::parse_from(["pgscand", "--host", "replica", "--dbname", "audit"]);
        let config = build_config(&args, &env).unwrap();
        assert_eq!(config.host, "replica");
        assert_eq!(config.database, "audit");
    }

    #[test]
    fn missing_user_is_a_config_error() {
        let err = build_config(&Args::parse_from(["pgscand"]), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvNotSet(_)));
    }

    #[test]
    fn interval_must_be_positive() {
        assert!(Args::try_parse_from(["pgscand", "--interval", "0"]).is_err());
        let args = Args::try_parse_from(["pgscand", "--interval", "1"]).unwrap();
        assert_eq!(args.interval, 1);
    }

    #[test]
    fn exclude_is_repeatable() {
        let args = Args::parse_from([
            "pgscand",
            "--user",
            "u",
            "--exclude",
            "public.ignore_me",
            "--exclude",
            "public.ignore_me_too",
        ]);
        assert_eq!(args.exclude, vec!["public.ignore_me", "public.ignore_me_too"]);
    }
}
