//! In-process store with fault injection.
//!
//! Mirrors the PostgreSQL behaviour the pipeline depends on: isolated
//! transactions, all-or-nothing commits, a store-computed `total_cents` on
//! `invoices_with_virtual`, and a rollback that is a no-op once committed.
//! Faults can be scheduled on the N-th insert, commit, or begin across the
//! whole store.

use crate::error::SeedError;
use crate::store::{Store, Table, Transaction};
use async_trait::async_trait;
use invoice_generator::InvoiceRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A committed row of `invoices_with_virtual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredInvoice {
    pub id: u64,
    pub record: InvoiceRecord,
    pub total_cents: i64,
}

#[derive(Debug, Default)]
struct Tables {
    with_virtual: Vec<StoredInvoice>,
    without_virtual: Vec<(u64, InvoiceRecord)>,
    batch_sql: Vec<String>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_count_rows: bool,
    fail_begin_at: Option<u64>,
    fail_insert_at: Option<u64>,
    fail_commit_at: Option<u64>,
    insert_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Counters {
    begins: AtomicU64,
    inserts: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    faults: Faults,
    counters: Counters,
}

/// In-memory [`Store`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

/// Counters of store activity, including failed attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub begins: u64,
    pub inserts: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder holding fault and preload settings.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    pub fn stats(&self) -> MemoryStats {
        let c = &self.shared.counters;
        MemoryStats {
            begins: c.begins.load(Ordering::SeqCst),
            inserts: c.inserts.load(Ordering::SeqCst),
            commits: c.commits.load(Ordering::SeqCst),
            rollbacks: c.rollbacks.load(Ordering::SeqCst),
        }
    }

    /// Committed rows of `invoices_with_virtual`, in insert order.
    pub async fn with_virtual_rows(&self) -> Vec<StoredInvoice> {
        self.shared.tables.lock().await.with_virtual.clone()
    }

    /// Committed rows of `invoices_without_virtual`, in insert order.
    pub async fn without_virtual_rows(&self) -> Vec<InvoiceRecord> {
        self.shared
            .tables
            .lock()
            .await
            .without_virtual
            .iter()
            .map(|(_, record)| *record)
            .collect()
    }

    /// SQL passed to [`Store::batch_execute`], in call order.
    pub async fn executed_sql(&self) -> Vec<String> {
        self.shared.tables.lock().await.batch_sql.clone()
    }
}

/// Builder for a [`MemoryStore`] with preloaded rows or scheduled faults.
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    preload: Vec<InvoiceRecord>,
    faults: Faults,
}

impl MemoryStoreBuilder {
    /// Start with `records` already committed to both tables.
    pub fn preload(mut self, records: impl IntoIterator<Item = InvoiceRecord>) -> Self {
        self.preload.extend(records);
        self
    }

    /// Fail every `count_rows` call.
    pub fn fail_count_rows(mut self) -> Self {
        self.faults.fail_count_rows = true;
        self
    }

    /// Fail the `n`-th (1-based) `begin` call.
    pub fn fail_begin_at(mut self, n: u64) -> Self {
        self.faults.fail_begin_at = Some(n);
        self
    }

    /// Fail the `n`-th (1-based) insert executed against the store.
    pub fn fail_insert_at(mut self, n: u64) -> Self {
        self.faults.fail_insert_at = Some(n);
        self
    }

    /// Fail the `n`-th (1-based) commit.
    pub fn fail_commit_at(mut self, n: u64) -> Self {
        self.faults.fail_commit_at = Some(n);
        self
    }

    /// Sleep this long on every insert.
    pub fn insert_delay(mut self, delay: Duration) -> Self {
        self.faults.insert_delay = Some(delay);
        self
    }

    pub fn build(self) -> MemoryStore {
        let mut tables = Tables::default();
        for (i, record) in self.preload.into_iter().enumerate() {
            let id = i as u64 + 1;
            tables.with_virtual.push(StoredInvoice {
                id,
                record,
                total_cents: record.total_cents(),
            });
            tables.without_virtual.push((id, record));
        }

        MemoryStore {
            shared: Arc::new(Shared {
                tables: Mutex::new(tables),
                faults: self.faults,
                counters: Counters::default(),
            }),
        }
    }
}

fn nth_call(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[async_trait]
impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn count_rows(&self, table: Table) -> Result<u64, SeedError> {
        if self.shared.faults.fail_count_rows {
            return Err(SeedError::Store("injected count failure".to_string()));
        }
        let tables = self.shared.tables.lock().await;
        let count = match table {
            Table::WithVirtual => tables.with_virtual.len(),
            Table::WithoutVirtual => tables.without_virtual.len(),
        };
        Ok(count as u64)
    }

    async fn begin(&self) -> Result<MemoryTransaction, SeedError> {
        let n = nth_call(&self.shared.counters.begins);
        if self.shared.faults.fail_begin_at == Some(n) {
            return Err(SeedError::Store(format!("injected begin failure #{n}")));
        }
        Ok(MemoryTransaction {
            shared: self.shared.clone(),
            pending: Vec::new(),
            finished: false,
        })
    }

    async fn batch_execute(&self, sql: &str) -> Result<(), SeedError> {
        self.shared.tables.lock().await.batch_sql.push(sql.to_string());
        Ok(())
    }
}

/// Transaction buffering writes until commit.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    pending: Vec<(Table, InvoiceRecord)>,
    finished: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), SeedError> {
        if self.finished {
            return Err(SeedError::Store("transaction already finished".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    type Statement = Table;

    async fn prepare(&mut self, sql: &str) -> Result<Table, SeedError> {
        self.ensure_open()?;
        Table::from_insert_sql(sql)
            .ok_or_else(|| SeedError::Store(format!("unsupported statement: {sql}")))
    }

    async fn execute(&mut self, statement: &Table, record: &InvoiceRecord) -> Result<(), SeedError> {
        self.ensure_open()?;
        if let Some(delay) = self.shared.faults.insert_delay {
            tokio::time::sleep(delay).await;
        }
        let n = nth_call(&self.shared.counters.inserts);
        if self.shared.faults.fail_insert_at == Some(n) {
            return Err(SeedError::Store(format!("injected insert failure #{n}")));
        }
        self.pending.push((*statement, *record));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SeedError> {
        self.ensure_open()?;
        let n = nth_call(&self.shared.counters.commits);
        if self.shared.faults.fail_commit_at == Some(n) {
            // A failed commit leaves the transaction aborted.
            self.finished = true;
            self.pending.clear();
            return Err(SeedError::Store(format!("injected commit failure #{n}")));
        }

        let mut tables = self.shared.tables.lock().await;
        for (table, record) in self.pending.drain(..) {
            match table {
                Table::WithVirtual => {
                    let id = tables.with_virtual.len() as u64 + 1;
                    tables.with_virtual.push(StoredInvoice {
                        id,
                        record,
                        total_cents: record.total_cents(),
                    });
                }
                Table::WithoutVirtual => {
                    let id = tables.without_virtual.len() as u64 + 1;
                    tables.without_virtual.push((id, record));
                }
            }
        }
        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SeedError> {
        if self.finished {
            return Ok(());
        }
        self.shared.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.pending.clear();
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(customer_id: i64) -> InvoiceRecord {
        InvoiceRecord {
            customer_id,
            amount_cents: 1_000,
            tax_rate: Decimal::new(10, 2),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let stmt = tx.prepare(&Table::WithVirtual.insert_sql()).await.unwrap();
        tx.execute(&stmt, &record(1)).await.unwrap();

        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 0);
        tx.commit().await.unwrap();
        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 1);

        let rows = store.with_virtual_rows().await;
        assert_eq!(rows[0].total_cents, 1_100);
    }

    #[tokio::test]
    async fn test_rollback_after_commit_is_noop() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let stmt = tx.prepare(&Table::WithoutVirtual.insert_sql()).await.unwrap();
        tx.execute(&stmt, &record(2)).await.unwrap();
        tx.commit().await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.count_rows(Table::WithoutVirtual).await.unwrap(), 1);
        assert_eq!(store.stats().rollbacks, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_pending() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let stmt = tx.prepare(&Table::WithVirtual.insert_sql()).await.unwrap();
        tx.execute(&stmt, &record(3)).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(tx.commit().await.is_err());
        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 0);
        assert_eq!(store.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_injected_insert_failure() {
        let store = MemoryStore::builder().fail_insert_at(2).build();
        let mut tx = store.begin().await.unwrap();
        let stmt = tx.prepare(&Table::WithVirtual.insert_sql()).await.unwrap();

        assert!(tx.execute(&stmt, &record(1)).await.is_ok());
        assert!(tx.execute(&stmt, &record(2)).await.is_err());
        assert!(tx.execute(&stmt, &record(3)).await.is_ok());
    }

    #[tokio::test]
    async fn test_preload_and_unknown_statement() {
        let store = MemoryStore::builder().preload([record(1), record(2)]).build();
        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 2);
        assert_eq!(store.count_rows(Table::WithoutVirtual).await.unwrap(), 2);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.prepare("DELETE FROM invoices_with_virtual").await.is_err());
    }
}
