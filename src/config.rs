//! Database connection settings.

use anyhow::{anyhow, bail, Context};
use clap::Args;
use invoice_populate_postgresql::DEFAULT_MAX_CONNECTIONS;
use std::fmt;
use tokio_postgres::config::SslMode;

/// PostgreSQL connection options, normally taken from `DB_*` variables.
#[derive(Args, Clone)]
pub struct DbOpts {
    /// PostgreSQL host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// PostgreSQL port
    #[arg(long, env = "DB_PORT", default_value = "5432")]
    pub db_port: String,

    /// PostgreSQL user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// PostgreSQL password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// SSL mode (disable, allow, prefer)
    #[arg(long, env = "DB_SSLMODE", default_value = "disable")]
    pub db_sslmode: String,

    /// Maximum number of simultaneously open connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub db_max_connections: usize,
}

impl DbOpts {
    /// Check that every required setting is present and well formed.
    pub fn validate(&self) -> anyhow::Result<()> {
        required(&self.db_host, "DB_HOST")?;
        required(&self.db_user, "DB_USER")?;
        required(&self.db_name, "DB_NAME")?;
        self.port()?;
        self.ssl_mode()?;
        if self.db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    fn port(&self) -> anyhow::Result<u16> {
        self.db_port
            .parse()
            .with_context(|| format!("DB_PORT is not a valid port: {:?}", self.db_port))
    }

    // Connections are plain TCP, so modes that demand TLS are refused here
    // rather than failing on connect.
    fn ssl_mode(&self) -> anyhow::Result<SslMode> {
        match self.db_sslmode.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" | "prefer" => Ok(SslMode::Prefer),
            other => Err(anyhow!(
                "DB_SSLMODE {other:?} is not supported (use disable, allow or prefer)"
            )),
        }
    }

    /// Build the driver configuration. Validates first.
    pub fn to_pg_config(&self) -> anyhow::Result<tokio_postgres::Config> {
        self.validate()?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(required(&self.db_host, "DB_HOST")?)
            .port(self.port()?)
            .user(required(&self.db_user, "DB_USER")?)
            .dbname(required(&self.db_name, "DB_NAME")?)
            .ssl_mode(self.ssl_mode()?)
            .application_name("invoice-bench");
        if let Some(password) = self.db_password.as_deref().filter(|p| !p.is_empty()) {
            config.password(password);
        }
        Ok(config)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{name} is required"))
}

/// Connection string with the password masked, safe to log.
impl fmt::Display for DbOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} port={} user={} password={} dbname={} sslmode={}",
            self.db_host.as_deref().unwrap_or_default(),
            self.db_port,
            self.db_user.as_deref().unwrap_or_default(),
            if self.db_password.is_some() { "***" } else { "" },
            self.db_name.as_deref().unwrap_or_default(),
            self.db_sslmode
        )
    }
}

impl fmt::Debug for DbOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DbOpts({self})")
    }
}
