//! Scheduled reconciliation sweeps.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use fedidir_common::config::ReconciliationConfig;
use fedidir_core::{ReconciliationService, SweepReport};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Scheduled job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledJob {
    /// Re-probe instances banned for failing health checks.
    RetryBannedInstances,
    /// Probe every instance that is not banned.
    CheckActiveInstances,
}

impl ScheduledJob {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RetryBannedInstances => "retry_banned_instances",
            Self::CheckActiveInstances => "check_active_instances",
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Whether sweeps run at all.
    pub enabled: bool,
    /// Interval for the banned-instance retry sweep (default: 1 hour).
    pub retry_interval: Duration,
    /// Interval for the active-instance check sweep (default: 6 hours).
    pub check_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&ReconciliationConfig::default())
    }
}

impl From<&ReconciliationConfig> for SchedulerConfig {
    fn from(config: &ReconciliationConfig) -> Self {
        Self {
            enabled: config.enabled,
            retry_interval: Duration::from_secs(config.retry_interval_secs),
            check_interval: Duration::from_secs(config.check_interval_secs),
        }
    }
}

type JobError = Box<dyn std::error::Error + Send + Sync>;

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute the banned-instance retry sweep.
    async fn retry_banned_instances(&self) -> Result<SweepReport, JobError>;

    /// Execute the active-instance check sweep.
    async fn check_active_instances(&self) -> Result<SweepReport, JobError>;

    async fn execute(&self, job: ScheduledJob) -> Result<SweepReport, JobError> {
        match job {
            ScheduledJob::RetryBannedInstances => self.retry_banned_instances().await,
            ScheduledJob::CheckActiveInstances => self.check_active_instances().await,
        }
    }
}

#[async_trait::async_trait]
impl JobExecutor for ReconciliationService {
    async fn retry_banned_instances(&self) -> Result<SweepReport, JobError> {
        Ok(self.retry_banned().await?)
    }

    async fn check_active_instances(&self) -> Result<SweepReport, JobError> {
        Ok(self.check_active().await?)
    }
}

/// Run the scheduler with the given configuration and executor.
///
/// Each job gets its own task. A sweep that overruns its interval delays the
/// next tick instead of overlapping with it.
pub fn run_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    executor: Arc<E>,
) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Reconciliation scheduler disabled");
        return Vec::new();
    }

    [
        (ScheduledJob::RetryBannedInstances, config.retry_interval),
        (ScheduledJob::CheckActiveInstances, config.check_interval),
    ]
    .into_iter()
    .map(|(job, period)| spawn_job(job, period, executor.clone()))
    .collect()
}

fn spawn_job<E: JobExecutor + 'static>(
    job: ScheduledJob,
    period: Duration,
    executor: Arc<E>,
) -> JoinHandle<()> {
    let period = period.max(Duration::from_secs(1));
    tracing::info!(job = job.name(), period_secs = period.as_secs(), "Scheduling job");

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match executor.execute(job).await {
                Ok(report) => {
                    tracing::debug!(
                        job = job.name(),
                        selected = report.selected,
                        errors = report.errors.len(),
                        "Scheduled job completed"
                    );
                }
                Err(e) => {
                    tracing::error!(job = job.name(), error = %e, "Scheduled job failed");
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fedidir_core::SweepScope;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        retries: AtomicUsize,
        checks: AtomicUsize,
    }

    fn report(scope: SweepScope) -> SweepReport {
        SweepReport {
            scope,
            selected: 0,
            healthy: 0,
            degraded: 0,
            banned: 0,
            errors: Vec::new(),
        }
    }

    #[async_trait::async_trait]
    impl JobExecutor for CountingExecutor {
        async fn retry_banned_instances(&self) -> Result<SweepReport, JobError> {
            self.retries.fetch_add(1, Ordering::SeqCst);
            Ok(report(SweepScope::HealthBanned))
        }

        async fn check_active_instances(&self) -> Result<SweepReport, JobError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Err("database unavailable".into())
        }
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.retry_interval, Duration::from_secs(3600));
        assert_eq!(config.check_interval, Duration::from_secs(21600));
    }

    #[tokio::test]
    async fn test_disabled_scheduler_spawns_nothing() {
        let config = SchedulerConfig {
            enabled: false,
            ..SchedulerConfig::default()
        };
        let handles = run_scheduler(config, Arc::new(CountingExecutor::default()));
        assert!(handles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_on_their_own_intervals() {
        let executor = Arc::new(CountingExecutor::default());
        let config = SchedulerConfig {
            enabled: true,
            retry_interval: Duration::from_secs(10),
            check_interval: Duration::from_secs(25),
        };

        let handles = run_scheduler(config, executor.clone());
        tokio::time::sleep(Duration::from_secs(51)).await;

        assert_eq!(executor.retries.load(Ordering::SeqCst), 5);
        // Failures are logged and the loop keeps going.
        assert_eq!(executor.checks.load(Ordering::SeqCst), 2);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_job() {
        let executor = CountingExecutor::default();
        executor.execute(ScheduledJob::RetryBannedInstances).await.unwrap();
        assert!(executor.execute(ScheduledJob::CheckActiveInstances).await.is_err());
        assert_eq!(executor.retries.load(Ordering::SeqCst), 1);
        assert_eq!(executor.checks.load(Ordering::SeqCst), 1);
    }
}
