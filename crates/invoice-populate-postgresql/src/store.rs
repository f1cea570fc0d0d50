//! Store abstraction the seeding pipeline writes through.
//!
//! The pipeline only needs row counts, independent transactions, prepared
//! inserts, and DDL execution. [`crate::postgres::PostgresStore`] implements
//! it against a real server and [`crate::memory::MemoryStore`] in process.

use crate::error::SeedError;
use async_trait::async_trait;
use invoice_generator::InvoiceRecord;
use std::fmt;

/// The two mirrored invoice tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Stores the raw inputs plus a store-computed `total_cents` column.
    WithVirtual,
    /// Stores the raw inputs only.
    WithoutVirtual,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::WithVirtual, Table::WithoutVirtual];

    pub fn name(&self) -> &'static str {
        match self {
            Table::WithVirtual => "invoices_with_virtual",
            Table::WithoutVirtual => "invoices_without_virtual",
        }
    }

    /// Parameterized insert of `(customer_id, amount_cents, tax_rate)`.
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (customer_id, amount_cents, tax_rate) VALUES ($1, $2, $3)",
            self.name()
        )
    }

    /// Find the table an insert statement targets.
    pub fn from_insert_sql(sql: &str) -> Option<Table> {
        let target = sql
            .split_whitespace()
            .skip_while(|word| !word.eq_ignore_ascii_case("INTO"))
            .nth(1)?;
        Table::ALL
            .into_iter()
            .find(|table| target.trim_matches('"') == table.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store holding the mirrored invoice tables.
///
/// Implementations must allow many transactions to be open at once, one per
/// worker.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Transaction: Transaction;

    /// Count the rows currently in `table`.
    async fn count_rows(&self, table: Table) -> Result<u64, SeedError>;

    /// Open a new transaction.
    async fn begin(&self) -> Result<Self::Transaction, SeedError>;

    /// Run one or more SQL statements outside any transaction (DDL).
    async fn batch_execute(&self, sql: &str) -> Result<(), SeedError>;
}

/// An open transaction.
///
/// Dropping a transaction that was neither committed nor rolled back
/// discards its writes.
#[async_trait]
pub trait Transaction: Send {
    type Statement: Send + Sync;

    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement, SeedError>;

    /// Execute a prepared insert, binding the record's fields as
    /// `$1 = customer_id`, `$2 = amount_cents`, `$3 = tax_rate`.
    async fn execute(
        &mut self,
        statement: &Self::Statement,
        record: &InvoiceRecord,
    ) -> Result<(), SeedError>;

    async fn commit(&mut self) -> Result<(), SeedError>;

    /// Roll back. A no-op once the transaction has already finished, so it
    /// is safe to call after a successful commit.
    async fn rollback(&mut self) -> Result<(), SeedError>;
}
