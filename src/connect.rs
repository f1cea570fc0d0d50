use crate::config::DbOpts;
use anyhow::Context;
use invoice_populate_postgresql::PostgresStore;

// Connect to the PostgreSQL instance holding the invoice tables
pub async fn connect_store(db_opts: &DbOpts) -> anyhow::Result<PostgresStore> {
    let config = db_opts.to_pg_config()?;
    tracing::info!("Connecting to PostgreSQL: {}", db_opts);

    PostgresStore::connect(config, db_opts.db_max_connections)
        .await
        .context("Failed to connect to database")
}
