//! CLI argument definitions and seed settings.

use clap::Args;

/// Row count the tables are filled up to when `SEED_COUNT` is unusable.
pub const DEFAULT_TARGET_TOTAL: u64 = 1_000_000_000;

/// Worker count used when `SEED_WORKERS` is unusable.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Largest worker count accepted from `SEED_WORKERS`.
pub const MAX_WORKER_COUNT: usize = 1_024;

/// Rows per batch transaction. Not configurable.
pub const BATCH_SIZE: u64 = 5_000;

/// Seed arguments.
///
/// The counts are taken as raw strings on purpose: an unparsable value is
/// replaced by its default instead of failing startup.
#[derive(Args, Clone, Debug, Default)]
pub struct SeedArgs {
    /// Total number of rows each invoice table should hold
    #[arg(long, env = "SEED_COUNT")]
    pub seed_count: Option<String>,

    /// Number of concurrent insert workers
    #[arg(long, env = "SEED_WORKERS")]
    pub seed_workers: Option<String>,

    /// Log the seed plan without writing any rows
    #[arg(long)]
    pub dry_run: bool,
}

impl SeedArgs {
    /// Resolve the raw arguments into settings, falling back to defaults.
    pub fn settings(&self) -> SeedSettings {
        SeedSettings::from_raw(self.seed_count.as_deref(), self.seed_workers.as_deref())
    }
}

/// Resolved settings for one seed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSettings {
    pub target_total: u64,
    pub worker_count: usize,
    pub batch_size: u64,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            target_total: DEFAULT_TARGET_TOTAL,
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: BATCH_SIZE,
        }
    }
}

impl SeedSettings {
    /// Build settings from raw strings.
    ///
    /// A missing or unparsable target becomes the default; a negative one is
    /// clamped to `0`, which leaves nothing to seed. A worker count that is
    /// missing, unparsable, zero, or above [`MAX_WORKER_COUNT`] becomes the
    /// default.
    pub fn from_raw(target_total: Option<&str>, worker_count: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            target_total: parse_target(target_total).unwrap_or(defaults.target_total),
            worker_count: parse_worker_count(worker_count).unwrap_or(defaults.worker_count),
            batch_size: defaults.batch_size,
        }
    }
}

fn parse_target(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|value| value.max(0) as u64)
}

fn parse_worker_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|value| (1..=MAX_WORKER_COUNT).contains(value))
}
