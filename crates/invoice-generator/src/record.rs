//! Invoice record generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::ops::RangeInclusive;
use std::time::{SystemTime, UNIX_EPOCH};

/// Range of generated customer ids.
pub const CUSTOMER_ID_RANGE: RangeInclusive<i64> = 1..=10_000;

/// Range of generated pre-tax amounts, in cents.
pub const AMOUNT_CENTS_RANGE: RangeInclusive<i64> = 100..=1_000_099;

/// Number of discrete tax rates (0.01 through 0.25 in steps of 0.01).
pub const TAX_RATE_STEPS: i64 = 25;

/// One synthetic invoice, as written to both mirrored tables.
///
/// There is no id field: the database assigns one on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceRecord {
    pub customer_id: i64,
    pub amount_cents: i64,
    /// Scale-2 decimal, stored as `NUMERIC(4,2)`.
    pub tax_rate: Decimal,
}

impl InvoiceRecord {
    /// Total in cents after tax, rounded half away from zero.
    ///
    /// Matches the `total_cents` generated column of `invoices_with_virtual`.
    pub fn total_cents(&self) -> i64 {
        let total = Decimal::from(self.amount_cents) * (Decimal::ONE + self.tax_rate);
        total
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }
}

/// Draw the next record from `rng`.
///
/// Consumes exactly three draws, in field order.
pub fn next_record<R: Rng>(rng: &mut R) -> InvoiceRecord {
    let customer_id = rng.random_range(CUSTOMER_ID_RANGE);
    let amount_cents = rng.random_range(AMOUNT_CENTS_RANGE);
    let step = rng.random_range(0..TAX_RATE_STEPS);

    InvoiceRecord {
        customer_id,
        amount_cents,
        tax_rate: Decimal::new(step + 1, 2),
    }
}

/// Build a private RNG for one worker.
///
/// Seeded from the wall clock mixed with the worker index so that workers
/// started in the same instant still get distinct streams. Not reproducible
/// and not suitable for anything security related.
pub fn worker_rng(worker_index: usize) -> StdRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    StdRng::seed_from_u64(
        nanos.wrapping_add((worker_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
    )
}
