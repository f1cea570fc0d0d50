//! DDL for the mirrored invoice tables.

use crate::error::SeedError;
use crate::store::Store;
use tracing::{debug, info};

/// Creates both tables and their `customer_id` indexes if missing.
///
/// `invoices_with_virtual.total_cents` is computed by PostgreSQL at write
/// time; the seeding pipeline never supplies it.
pub const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS invoices_with_virtual (
    id           BIGSERIAL PRIMARY KEY,
    customer_id  BIGINT NOT NULL,
    amount_cents BIGINT NOT NULL,
    tax_rate     NUMERIC(4,2) NOT NULL,
    total_cents  BIGINT GENERATED ALWAYS AS (
        ROUND(amount_cents * (1 + tax_rate))
    ) STORED
);

CREATE TABLE IF NOT EXISTS invoices_without_virtual (
    id           BIGSERIAL PRIMARY KEY,
    customer_id  BIGINT NOT NULL,
    amount_cents BIGINT NOT NULL,
    tax_rate     NUMERIC(4,2) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoices_with_virtual_customer ON invoices_with_virtual(customer_id);
CREATE INDEX IF NOT EXISTS idx_invoices_without_virtual_customer ON invoices_without_virtual(customer_id);
"#;

/// Create the invoice tables. Idempotent.
pub async fn create_schema<S: Store + ?Sized>(store: &S) -> Result<(), SeedError> {
    debug!("DDL: {}", CREATE_SCHEMA_SQL);
    store.batch_execute(CREATE_SCHEMA_SQL).await?;
    info!("Schema created successfully");
    Ok(())
}
