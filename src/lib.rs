//! invoice-bench Library
//!
//! Populates two mirrored PostgreSQL invoice tables, one with a stored
//! generated `total_cents` column and one without, so the two query
//! strategies can be compared on identical data.
//!
//! # CLI Usage
//!
//! ```bash
//! # Create tables and fill them to SEED_COUNT rows
//! DB_HOST=localhost DB_USER=postgres DB_NAME=invoices SEED_COUNT=1000000 invoice-bench run
//!
//! # Show the row counts of both tables
//! invoice-bench stats
//! ```

pub mod config;
pub mod connect;

pub use config::DbOpts;
pub use connect::connect_store;
