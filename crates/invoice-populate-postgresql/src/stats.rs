//! Row counts of the mirrored tables.

use crate::error::SeedError;
use crate::store::{Store, Table};

/// Row counts of both invoice tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub with_virtual: u64,
    pub without_virtual: u64,
}

impl TableStats {
    pub async fn collect<S: Store + ?Sized>(store: &S) -> Result<Self, SeedError> {
        Ok(Self {
            with_virtual: store.count_rows(Table::WithVirtual).await?,
            without_virtual: store.count_rows(Table::WithoutVirtual).await?,
        })
    }

    /// Both tables hold the same number of rows.
    pub fn is_synchronized(&self) -> bool {
        self.with_virtual == self.without_virtual
    }
}
