//! Error types for the seeding pipeline.

use crate::store::Table;
use thiserror::Error;

/// Errors that can occur while seeding the invoice tables.
#[derive(Error, Debug)]
pub enum SeedError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// No pooled connection could be obtained.
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Error raised by a non-PostgreSQL store.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Counting the existing rows failed.
    #[error("Failed to check existing data: {0}")]
    CountRows(Box<SeedError>),

    #[error("Failed to begin transaction: {0}")]
    BeginTransaction(Box<SeedError>),

    #[error("Failed to prepare statement: {0}")]
    Prepare(Box<SeedError>),

    #[error("Failed to insert into {table}: {error}")]
    Insert { table: Table, error: Box<SeedError> },

    #[error("Failed to commit transaction: {0}")]
    Commit(Box<SeedError>),

    /// Fewer outcomes arrived than workers were spawned (a worker panicked).
    #[error("{missing} worker(s) exited without reporting an outcome")]
    WorkersLost { missing: usize },
}

impl SeedError {
    /// Whether the error came out of a single batch transaction.
    pub fn is_batch_failure(&self) -> bool {
        matches!(
            self,
            SeedError::BeginTransaction(_)
                | SeedError::Prepare(_)
                | SeedError::Insert { .. }
                | SeedError::Commit(_)
        )
    }
}
