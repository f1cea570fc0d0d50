//! PostgreSQL store backed by a `deadpool-postgres` connection pool.

use crate::error::SeedError;
use crate::store::{Store, Table, Transaction};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use invoice_generator::InvoiceRecord;
use tokio_postgres::{Config, NoTls, Statement};
use tracing::{debug, info};

/// Default cap on simultaneously open connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 25;

/// PostgreSQL implementation of [`Store`].
///
/// Connections are opened lazily up to `max_connections` and reused once a
/// transaction finishes, so concurrent workers each get their own session.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Connect to PostgreSQL and verify the connection.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config: tokio_postgres::Config =
    ///     "host=localhost user=postgres dbname=invoices".parse()?;
    /// let store = PostgresStore::connect(config, 25).await?;
    /// ```
    pub async fn connect(config: Config, max_connections: usize) -> Result<Self, SeedError> {
        if max_connections == 0 {
            return Err(SeedError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
                ..Default::default()
            },
        );
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| SeedError::Connection(e.to_string()))?;

        // Test connection
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        drop(client);

        info!("Database connected successfully");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn count_rows(&self, table: Table) -> Result<u64, SeedError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let row = client.query_one(&sql, &[]).await?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn begin(&self) -> Result<PostgresTransaction, SeedError> {
        let client = self.pool.get().await?;
        client.batch_execute("BEGIN").await?;
        Ok(PostgresTransaction {
            client: Some(client),
        })
    }

    async fn batch_execute(&self, sql: &str) -> Result<(), SeedError> {
        let client = self.pool.get().await?;
        client.batch_execute(sql).await?;
        Ok(())
    }
}

/// Transaction on one pooled connection.
///
/// The connection goes back to the pool after COMMIT or ROLLBACK. If the
/// transaction is dropped while still open, or finishing it fails, the
/// connection is detached from the pool and closed; the server then discards
/// the uncommitted writes.
pub struct PostgresTransaction {
    client: Option<Object>,
}

impl PostgresTransaction {
    fn client(&self) -> Result<&Object, SeedError> {
        self.client
            .as_ref()
            .ok_or_else(|| SeedError::Store("transaction already finished".to_string()))
    }

    async fn finish(&mut self, sql: &str) -> Result<(), SeedError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        if let Err(e) = client.batch_execute(sql).await {
            // Session state is unknown, so the connection is not reused.
            drop(Object::take(client));
            return Err(e.into());
        }
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            debug!("Discarding connection of an unfinished transaction");
            drop(Object::take(client));
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    type Statement = Statement;

    async fn prepare(&mut self, sql: &str) -> Result<Statement, SeedError> {
        Ok(self.client()?.prepare_cached(sql).await?)
    }

    async fn execute(
        &mut self,
        statement: &Statement,
        record: &InvoiceRecord,
    ) -> Result<(), SeedError> {
        self.client()?
            .execute(
                statement,
                &[&record.customer_id, &record.amount_cents, &record.tax_rate],
            )
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SeedError> {
        if self.client.is_none() {
            return Err(SeedError::Store("transaction already finished".to_string()));
        }
        self.finish("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), SeedError> {
        self.finish("ROLLBACK").await
    }
}
