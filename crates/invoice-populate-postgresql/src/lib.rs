//! Concurrent seeding pipeline for the mirrored invoice tables.
//!
//! ```text
//!  Seeder ──count_rows──▶ Store
//!    │
//!    ├─ jobs (bounded, 2 × workers) ──▶ Worker 0..N ──insert_batch──▶ Store
//!    │                                     │
//!    │                          ProgressCounter ◀── ProgressReporter (every 5s)
//!    │
//!    └◀── one WorkerOutcome per worker
//! ```
//!
//! Each batch is one transaction writing every generated record to both
//! `invoices_with_virtual` and `invoices_without_virtual`.

pub mod args;
pub mod error;
pub mod insert;
pub mod memory;
pub mod populator;
pub mod postgres;
pub mod progress;
pub mod schema;
pub mod stats;
pub mod store;
pub mod worker;

pub use args::{SeedArgs, SeedSettings, BATCH_SIZE, MAX_WORKER_COUNT};
pub use error::SeedError;
pub use memory::MemoryStore;
pub use populator::{SeedPlan, SeedReport, Seeder};
pub use postgres::{PostgresStore, DEFAULT_MAX_CONNECTIONS};
pub use schema::create_schema;
pub use stats::TableStats;
pub use store::{Store, Table, Transaction};
