//! Synthetic invoice generator for the invoice-bench seeding pipeline.
//!
//! Every call to [`next_record`] draws three values from the caller's
//! random stream and returns an [`InvoiceRecord`]. The generator keeps no
//! state of its own, so each worker can own a private RNG and generate
//! without any synchronization.
//!
//! # Field ranges
//!
//! - `customer_id` - uniform over `1..=10_000`
//! - `amount_cents` - uniform over `100..=1_000_099`
//! - `tax_rate` - one of `0.01, 0.02, ..., 0.25`, uniform
//!
//! # Example
//!
//! ```rust
//! use invoice_generator::next_record;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let record = next_record(&mut rng);
//! assert!((1..=10_000).contains(&record.customer_id));
//! ```

pub mod record;

pub use record::{
    next_record, worker_rng, InvoiceRecord, AMOUNT_CENTS_RANGE, CUSTOMER_ID_RANGE,
    TAX_RATE_STEPS,
};
