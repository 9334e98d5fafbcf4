//! Connection parameters for the statistics session.
//!
//! The scanner never inspects these beyond building the driver config and
//! naming the target in error messages.

use std::fmt;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable not set.
    #[error("PostgreSQL: {0} not set")]
    EnvNotSet(String),
    /// Port could not be parsed.
    #[error("PostgreSQL: invalid port '{0}'")]
    InvalidPort(String),
}

/// PostgreSQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub application_name: String,
}

impl Config {
    /// Creates a config for `user@host:port/database` without a password.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: None,
            application_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Creates a config from standard libpq environment variables:
    /// - PGHOST (default: localhost)
    /// - PGPORT (default: 5432)
    /// - PGUSER (default: $USER)
    /// - PGPASSWORD (default: none)
    /// - PGDATABASE (default: same as PGUSER)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], but reads variables through `lookup`.
    ///
    /// Callers layer their own overrides by answering for a variable before
    /// falling back to the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user = lookup("PGUSER")
            .or_else(|| lookup("USER"))
            .ok_or_else(|| ConfigError::EnvNotSet("PGUSER or USER".to_string()))?;

        let host = lookup("PGHOST").unwrap_or_else(|| "localhost".to_string());
        let port = match lookup("PGPORT") {
            Some(raw) => parse_port(&raw)?,
            None => 5432,
        };
        let database = lookup("PGDATABASE").unwrap_or_else(|| user.clone());
        let password = lookup("PGPASSWORD").filter(|p| !p.is_empty());

        Ok(Self::new(host, port, database, user).with_password(password))
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Returns the operator-facing identity of the server this config points at.
    pub fn target(&self) -> Target {
        Target {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
        }
    }

    /// Builds the driver configuration.
    pub(crate) fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(self.host.as_str())
            .port(self.port)
            .dbname(self.database.as_str())
            .user(self.user.as_str())
            .application_name(self.application_name.as_str());
        if let Some(ref password) = self.password {
            pg.password(password.as_str());
        }
        pg
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Host, port, database and user of a server, as shown in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{} as {}",
            self.host, self.port, self.database, self.user
        )
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}
