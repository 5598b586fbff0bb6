//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::time::interval;

use crate::cache::ExpiringStore;
use crate::storage::{LedgerStore, LedgerTotals, StoreError, WalletStore};

// =========================================================================
// Callback cache purge
// =========================================================================

/// Drop expired payment references from the local cache
pub async fn purge_callback_cache(cache: &ExpiringStore<String, ()>) -> Result<u64, JobError> {
    let purged = cache.purge_expired().await as u64;

    if purged > 0 {
        tracing::info!(entries_purged = purged, "Purged expired callback references");
    }

    Ok(purged)
}

// =========================================================================
// Ledger reconciliation
// =========================================================================

/// Compare the sum of balances with the sum of applied top-ups.
/// Purchases and transfers move money without creating it, so any
/// difference means the ledger has drifted.
pub async fn reconcile_ledger<S>(store: &S) -> Result<LedgerTotals, JobError>
where
    S: WalletStore + ?Sized,
{
    let totals = store.ledger_totals().await?;

    if !totals.is_balanced() {
        tracing::error!(
            balances = %totals.balances,
            topups = %totals.topups,
            "Ledger drift detected"
        );
        return Err(JobError::LedgerDrift {
            balances: totals.balances,
            topups: totals.topups,
        });
    }

    tracing::debug!(balances = %totals.balances, "Ledger reconciled");
    Ok(totals)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for callback cache purge (default: 1 minute)
    pub cache_purge_interval: Duration,
    /// Interval for ledger reconciliation (default: 15 minutes)
    pub reconcile_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            cache_purge_interval: Duration::from_secs(60),
            reconcile_interval: Duration::from_secs(900),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    store: Arc<dyn LedgerStore>,
    callback_cache: ExpiringStore<String, ()>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(store: Arc<dyn LedgerStore>, callback_cache: ExpiringStore<String, ()>) -> Self {
        Self::with_config(store, callback_cache, JobSchedulerConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(
        store: Arc<dyn LedgerStore>,
        callback_cache: ExpiringStore<String, ()>,
        config: JobSchedulerConfig,
    ) -> Self {
        Self {
            store,
            callback_cache,
            config,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut purge_interval = interval(self.config.cache_purge_interval);
        let mut reconcile_interval = interval(self.config.reconcile_interval);

        loop {
            tokio::select! {
                _ = purge_interval.tick() => {
                    if let Err(e) = purge_callback_cache(&self.callback_cache).await {
                        tracing::error!(error = %e, "Callback cache purge failed");
                    }
                }
                _ = reconcile_interval.tick() => {
                    // Drift is logged inside the job
                    if let Err(JobError::Store(e)) = reconcile_ledger(self.store.as_ref()).await {
                        tracing::error!(error = %e, "Ledger reconciliation failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match purge_callback_cache(&self.callback_cache).await {
            Ok(count) => report.callback_refs_purged = count,
            Err(e) => report.errors.push(format!("Callback cache purge: {}", e)),
        }

        match reconcile_ledger(self.store.as_ref()).await {
            Ok(totals) => report.ledger_totals = Some(totals),
            Err(e) => report.errors.push(format!("Ledger reconciliation: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub callback_refs_purged: u64,
    /// Set when reconciliation found the ledger balanced
    pub ledger_totals: Option<LedgerTotals>,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger drift: balances {balances} != top-ups {topups}")]
    LedgerDrift { balances: Decimal, topups: Decimal },
}

// =========================================================================
// Tests
// =========================================================================
