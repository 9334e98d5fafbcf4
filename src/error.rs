//! Error taxonomy for the scanner.
//!
//! Every failure is either a session problem (`ErrorKind::Connection`) or a
//! protocol ordering violation (`ErrorKind::Initialisation`). Session errors
//! keep the driver failure as their `source()`.

use crate::config::Target;

/// Boxed failure reported by the database collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant shared by all [`ScanError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Initialisation,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Connection => "ERR_PG_SCANNER_CONNECTION_ERROR",
            ErrorKind::Initialisation => "ERR_PG_SCANNER_INITIALISATION_ERROR",
        }
    }
}

/// Error type for scanner operations.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Opening the session failed.
    #[error("Error connecting to {target}: {message}")]
    Connection {
        target: Target,
        message: String,
        #[source]
        source: BoxError,
    },
    /// Reading statistics over an open session failed.
    #[error("Error reading table statistics from {target}: {message}")]
    Query {
        target: Target,
        message: String,
        #[source]
        source: BoxError,
    },
    #[error("The scanner is already initialised")]
    AlreadyInitialised,
    #[error("Please initialise the scanner")]
    NotInitialised,
}

impl ScanError {
    pub(crate) fn connection(target: Target, source: BoxError) -> Self {
        ScanError::Connection {
            target,
            message: format_session_error(source.as_ref()),
            source,
        }
    }

    pub(crate) fn query(target: Target, source: BoxError) -> Self {
        ScanError::Query {
            target,
            message: format_session_error(source.as_ref()),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Connection { .. } | ScanError::Query { .. } => ErrorKind::Connection,
            ScanError::AlreadyInitialised | ScanError::NotInitialised => {
                ErrorKind::Initialisation
            }
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Server the failed session pointed at, for session errors.
    pub fn target(&self) -> Option<&Target> {
        match self {
            ScanError::Connection { target, .. } | ScanError::Query { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Formats a collaborator failure for display.
///
/// PostgreSQL server errors are condensed to `SEVERITY: message`, common
/// transport failures to a short phrase. Otherwise the whole `source()`
/// chain is joined, since driver errors only display their kind.
pub(crate) fn format_session_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> String {
    if let Some(pg) = e.downcast_ref::<tokio_postgres::Error>()
        && let Some(db_error) = pg.as_db_error()
    {
        return format!("{}: {}", db_error.severity(), db_error.message());
    }

    let msg = error_chain(e);
    if msg.contains("Connection refused") {
        "connection refused".to_string()
    } else if msg.contains("password authentication failed") {
        "password authentication failed".to_string()
    } else if msg.contains("does not exist") {
        msg.split("FATAL:")
            .last()
            .unwrap_or(&msg)
            .trim()
            .to_string()
    } else {
        msg
    }
}

/// Joins an error and its sources as `outer: inner: ...`.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}
