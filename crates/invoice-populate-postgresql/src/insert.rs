//! Batched transactional inserts into both invoice tables.

use crate::error::SeedError;
use crate::store::{Store, Table, Transaction};
use invoice_generator::next_record;
use rand::Rng;
use tracing::debug;

/// Generate `size` records and write each to both tables in one transaction.
///
/// All or nothing: on any failure the transaction is rolled back and none of
/// the batch's rows persist. Rollback is always issued once the batch ends;
/// after a successful commit it does nothing.
pub async fn insert_batch<S, R>(store: &S, size: u64, rng: &mut R) -> Result<(), SeedError>
where
    S: Store + ?Sized,
    R: Rng + Send,
{
    let mut tx = store
        .begin()
        .await
        .map_err(|e| SeedError::BeginTransaction(Box::new(e)))?;

    let result = write_and_commit(&mut tx, size, rng).await;

    if let Err(e) = tx.rollback().await {
        debug!("Rollback after batch failed: {}", e);
    }

    result
}

async fn write_and_commit<T, R>(tx: &mut T, size: u64, rng: &mut R) -> Result<(), SeedError>
where
    T: Transaction,
    R: Rng + Send,
{
    let with_virtual = tx
        .prepare(&Table::WithVirtual.insert_sql())
        .await
        .map_err(|e| SeedError::Prepare(Box::new(e)))?;
    let without_virtual = tx
        .prepare(&Table::WithoutVirtual.insert_sql())
        .await
        .map_err(|e| SeedError::Prepare(Box::new(e)))?;

    for _ in 0..size {
        let record = next_record(rng);

        tx.execute(&with_virtual, &record)
            .await
            .map_err(|e| SeedError::Insert {
                table: Table::WithVirtual,
                error: Box::new(e),
            })?;

        tx.execute(&without_virtual, &record)
            .await
            .map_err(|e| SeedError::Insert {
                table: Table::WithoutVirtual,
                error: Box::new(e),
            })?;
    }

    tx.commit()
        .await
        .map_err(|e| SeedError::Commit(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn test_batch_mirrors_both_tables() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(42);

        insert_batch(&store, 50, &mut rng).await.unwrap();

        let with: Vec<_> = store
            .with_virtual_rows()
            .await
            .into_iter()
            .map(|row| row.record)
            .collect();
        let without = store.without_virtual_rows().await;
        assert_eq!(with.len(), 50);
        assert_eq!(with, without);

        let stats = store.stats();
        assert_eq!(stats.begins, 1);
        assert_eq!(stats.inserts, 100);
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.rollbacks, 0);
    }

    #[tokio::test]
    async fn test_failure_on_every_insert_position_discards_batch() {
        const SIZE: u64 = 4;
        // Each record is two inserts; cover every one of them.
        for k in 1..=SIZE * 2 {
            let store = MemoryStore::builder().fail_insert_at(k).build();
            let mut rng = StdRng::seed_from_u64(k);

            let err = insert_batch(&store, SIZE, &mut rng).await.unwrap_err();
            assert!(matches!(err, SeedError::Insert { .. }), "k={k}: {err}");

            assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 0);
            assert_eq!(store.count_rows(Table::WithoutVirtual).await.unwrap(), 0);
            assert_eq!(store.stats().rollbacks, 1);
            assert_eq!(store.stats().inserts, k, "stops at the failing insert");
        }
    }

    #[tokio::test]
    async fn test_insert_error_names_table() {
        let store = MemoryStore::builder().fail_insert_at(2).build();
        let mut rng = StdRng::seed_from_u64(1);

        let err = insert_batch(&store, 3, &mut rng).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to insert into invoices_without_virtual"));
    }

    #[tokio::test]
    async fn test_commit_failure_discards_batch() {
        let store = MemoryStore::builder().fail_commit_at(1).build();
        let mut rng = StdRng::seed_from_u64(3);

        let err = insert_batch(&store, 10, &mut rng).await.unwrap_err();
        assert!(matches!(err, SeedError::Commit(_)));
        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_begin_failure() {
        let store = MemoryStore::builder().fail_begin_at(1).build();
        let mut rng = StdRng::seed_from_u64(3);

        let err = insert_batch(&store, 10, &mut rng).await.unwrap_err();
        assert!(matches!(err, SeedError::BeginTransaction(_)));
        assert!(err.is_batch_failure());
        assert_eq!(store.stats().inserts, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_commits_nothing() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(3);

        insert_batch(&store, 0, &mut rng).await.unwrap();
        assert_eq!(store.stats().commits, 1);
        assert_eq!(store.count_rows(Table::WithVirtual).await.unwrap(), 0);
    }
}
