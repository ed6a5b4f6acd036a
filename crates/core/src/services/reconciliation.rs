//! Health reconciliation sweeps.
//!
//! A sweep selects its instances once, re-probes each with bounded
//! concurrency, and applies the health transition per instance. Sweeps are
//! best effort: one instance failing to update never stops the others.
//! Sweeps of the same scope never overlap, so every write starts from a
//! selection taken after the previous sweep's writes.

use std::sync::Arc;

use fedidir_common::AppResult;
use fedidir_db::entities::instance;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::directory::DirectoryService;
use super::health::HealthState;
use super::probe::InstanceProber;

/// Which instances a sweep revisits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepScope {
    /// Instances banned for failing health checks.
    HealthBanned,
    /// Instances that are not banned.
    Active,
}

impl std::fmt::Display for SweepScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HealthBanned => f.write_str("health_banned"),
            Self::Active => f.write_str("active"),
        }
    }
}

/// An instance whose outcome could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepError {
    pub instance_id: String,
    pub uri: String,
    pub reason: String,
}

#[derive(Debug)]
enum InstanceOutcome {
    Reconciled(HealthState),
    Failed(SweepError),
}

/// Aggregate result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scope: SweepScope,
    pub selected: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub banned: usize,
    pub errors: Vec<SweepError>,
}

impl SweepReport {
    const fn empty(scope: SweepScope, selected: usize) -> Self {
        Self {
            scope,
            selected,
            healthy: 0,
            degraded: 0,
            banned: 0,
            errors: Vec::new(),
        }
    }

    fn record(&mut self, outcome: InstanceOutcome) {
        match outcome {
            InstanceOutcome::Reconciled(HealthState::Healthy) => self.healthy += 1,
            InstanceOutcome::Reconciled(HealthState::Degraded(_)) => self.degraded += 1,
            InstanceOutcome::Reconciled(HealthState::Banned) => self.banned += 1,
            InstanceOutcome::Failed(error) => self.errors.push(error),
        }
    }
}

#[derive(Clone)]
pub struct ReconciliationService {
    directory: DirectoryService,
    prober: InstanceProber,
    max_concurrency: usize,
    retry_lock: Arc<Mutex<()>>,
    check_lock: Arc<Mutex<()>>,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(directory: DirectoryService, prober: InstanceProber, max_concurrency: usize) -> Self {
        Self {
            directory,
            prober,
            max_concurrency: max_concurrency.max(1),
            retry_lock: Arc::new(Mutex::new(())),
            check_lock: Arc::new(Mutex::new(())),
        }
    }

    fn sweep_lock(&self, scope: SweepScope) -> &Mutex<()> {
        match scope {
            SweepScope::HealthBanned => &self.retry_lock,
            SweepScope::Active => &self.check_lock,
        }
    }

    /// Re-probe instances banned for failing health checks.
    pub async fn retry_banned(&self) -> AppResult<SweepReport> {
        self.run_sweep(SweepScope::HealthBanned).await
    }

    /// Probe every instance that is not banned.
    pub async fn check_active(&self) -> AppResult<SweepReport> {
        self.run_sweep(SweepScope::Active).await
    }

    /// Run one sweep. Only a failure to select the instances is an error.
    ///
    /// Waits for a running sweep of the same scope to finish first.
    pub async fn run_sweep(&self, scope: SweepScope) -> AppResult<SweepReport> {
        let lock = self.sweep_lock(scope);
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(scope = %scope, "Waiting for running sweep to finish");
                lock.lock().await
            }
        };

        let instances = match scope {
            SweepScope::HealthBanned => self.directory.list_health_banned().await?,
            SweepScope::Active => self.directory.list_active().await?,
        };

        let mut report = SweepReport::empty(scope, instances.len());
        let mut outcomes = stream::iter(instances)
            .map(|instance| self.reconcile(instance))
            .buffer_unordered(self.max_concurrency);

        while let Some(outcome) = outcomes.next().await {
            report.record(outcome);
        }

        info!(
            scope = %scope,
            selected = report.selected,
            healthy = report.healthy,
            degraded = report.degraded,
            banned = report.banned,
            errors = report.errors.len(),
            "Sweep finished"
        );
        Ok(report)
    }

    async fn reconcile(&self, instance: instance::Model) -> InstanceOutcome {
        let outcome = self.prober.probe_family(&instance.uri, instance.platform).await;

        match self.directory.update_health_and_snapshot(&instance, &outcome).await {
            Ok(state) => InstanceOutcome::Reconciled(state),
            Err(e) => {
                warn!(instance_id = %instance.id, uri = %instance.uri, error = %e, "Failed to record probe outcome");
                InstanceOutcome::Failed(SweepError {
                    instance_id: instance.id,
                    uri: instance.uri,
                    reason: e.source.to_string(),
                })
            }
        }
    }
}
