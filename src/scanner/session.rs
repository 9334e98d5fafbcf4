//! Per-cycle database session.
//!
//! Each cycle opens a fresh session, runs its body against it and closes it
//! on every exit path. Sessions are never reused across cycles.

use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{BoxError, ScanError, format_session_error};

/// One row of the statistics query, counters still in decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub schemaname: String,
    pub relname: String,
    pub seq_scan: String,
    pub seq_tup_read: String,
}

/// An open database session.
pub trait Session: Send {
    /// Runs the read-only statistics query.
    fn query_stats(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Vec<StatRow>, BoxError>> + Send;

    /// Releases the session.
    fn close(self) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Opens sessions from a [`Config`].
pub trait Connector: Send + Sync {
    type Session: Session;

    fn connect(
        &self,
        config: &Config,
    ) -> impl Future<Output = Result<Self::Session, BoxError>> + Send;
}

/// Opens a session, runs `body` with it and closes it afterwards.
///
/// `body` is not invoked when the session cannot be opened. The session is
/// closed whether `body` succeeds or fails; close failures are logged and do
/// not change the outcome.
pub async fn with_session<C, T>(
    connector: &C,
    config: &Config,
    body: impl AsyncFnOnce(&mut C::Session) -> Result<T, ScanError>,
) -> Result<T, ScanError>
where
    C: Connector,
{
    let mut session = connector
        .connect(config)
        .await
        .map_err(|source| ScanError::connection(config.target(), source))?;
    debug!(target_db = %config.target(), "session opened");

    let result = body(&mut session).await;

    match session.close().await {
        Ok(()) => debug!(target_db = %config.target(), "session closed"),
        Err(e) => warn!(
            target_db = %config.target(),
            error = %format_session_error(e.as_ref()),
            "failed to close session"
        ),
    }

    result
}

/// Connector backed by tokio-postgres.
///
/// Each connection is driven by a task spawned with [`tokio::spawn`], so
/// `connect` must be awaited inside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for PgConnector {
    type Session = PgSession;

    async fn connect(&self, config: &Config) -> Result<PgSession, BoxError> {
        let (client, connection) = config.to_pg_config().connect(NoTls).await?;
        let connection = tokio::spawn(connection);
        Ok(PgSession { client, connection })
    }
}

/// A tokio-postgres client plus the task driving its connection.
///
/// Dropping the session drops the client, which terminates the connection.
pub struct PgSession {
    client: Client,
    connection: JoinHandle<Result<(), tokio_postgres::Error>>,
}

impl Session for PgSession {
    async fn query_stats(&mut self, sql: &str) -> Result<Vec<StatRow>, BoxError> {
        let rows = self.client.query(sql, &[]).await?;
        let parsed = rows
            .iter()
            .map(parse_stat_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parsed)
    }

    async fn close(self) -> Result<(), BoxError> {
        let PgSession { client, connection } = self;
        drop(client);
        connection.await??;
        Ok(())
    }
}

fn parse_stat_row(row: &tokio_postgres::Row) -> Result<StatRow, tokio_postgres::Error> {
    Ok(StatRow {
        schemaname: row.try_get("schemaname")?,
        relname: row.try_get("relname")?,
        seq_scan: row.try_get("seq_scan")?,
        seq_tup_read: row.try_get("seq_tup_read")?,
    })
}
