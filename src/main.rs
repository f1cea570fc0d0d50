//! Command-line interface for invoice-bench
//!
//! # Usage Examples
//!
//! ```bash
//! # Create both invoice tables (idempotent)
//! invoice-bench schema
//!
//! # Fill the tables up to SEED_COUNT rows with SEED_WORKERS workers
//! SEED_COUNT=50000000 SEED_WORKERS=16 invoice-bench seed
//!
//! # Show what a seed run would do without writing
//! invoice-bench seed --dry-run
//!
//! # Schema followed by seed, as done at service startup
//! invoice-bench run
//!
//! # Compare the row counts of the two tables
//! invoice-bench stats
//! ```
//!
//! Connection settings come from `DB_HOST`, `DB_PORT`, `DB_USER`,
//! `DB_PASSWORD`, `DB_NAME` and `DB_SSLMODE`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use invoice_bench::{connect_store, DbOpts};
use invoice_populate_postgresql::{
    create_schema, PostgresStore, SeedArgs, Seeder, TableStats,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "invoice-bench")]
#[command(about = "Seed and inspect mirrored PostgreSQL invoice tables")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    db: DbOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the invoice tables and indexes
    Schema,

    /// Fill both tables up to the target row count
    Seed {
        #[command(flatten)]
        args: SeedArgs,
    },

    /// Create the schema, then seed
    Run {
        #[command(flatten)]
        args: SeedArgs,
    },

    /// Print the row counts of both tables
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Arc::new(connect_store(&cli.db).await?);

    match cli.command {
        Commands::Schema => {
            create_schema(store.as_ref())
                .await
                .context("Failed to run schema")?;
        }
        Commands::Seed { args } => {
            run_seed(store, &args).await?;
        }
        Commands::Run { args } => {
            create_schema(store.as_ref())
                .await
                .context("Failed to run schema")?;
            run_seed(store, &args).await?;
        }
        Commands::Stats => {
            let stats = TableStats::collect(store.as_ref())
                .await
                .context("Failed to count rows")?;
            tracing::info!(
                "invoices_with_virtual: {} rows, invoices_without_virtual: {} rows",
                stats.with_virtual,
                stats.without_virtual
            );
            if !stats.is_synchronized() {
                tracing::warn!(
                    "Tables are out of sync by {} rows",
                    stats.with_virtual.abs_diff(stats.without_virtual)
                );
            }
        }
    }

    Ok(())
}

async fn run_seed(store: Arc<PostgresStore>, args: &SeedArgs) -> anyhow::Result<()> {
    let seeder = Seeder::new(store, args.settings());

    if args.dry_run {
        let plan = seeder.plan().await.context("Failed to seed data")?;
        tracing::info!(
            "[DRY-RUN] Target {} rows, existing {}, would insert {} rows in {} batches (last batch: {} rows) with {} workers",
            plan.target_total,
            plan.existing,
            plan.remaining(),
            plan.job_count(),
            plan.last_job_size().unwrap_or(0),
            seeder.settings().worker_count
        );
        return Ok(());
    }

    // The seed itself has no cancellation; an interrupt abandons it and
    // PostgreSQL rolls back whatever batches were open.
    tokio::select! {
        result = seeder.seed() => {
            let report = result.context("Failed to seed data")?;
            tracing::debug!("Seed report: {:?}", report);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, abandoning seed run");
            anyhow::bail!("Seeding interrupted");
        }
    }

    Ok(())
}
