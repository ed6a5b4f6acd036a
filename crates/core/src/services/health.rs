//! Health state machine for directory instances.

use fedidir_db::entities::instance;
pub use fedidir_db::repositories::HEALTH_BAN_REASON;
use serde::Serialize;

/// Consecutive failed probes after which an instance is banned.
pub const MAX_FAILED_CHECKS: i32 = 5;

/// Where an instance stands after its latest probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "failedChecks")]
pub enum HealthState {
    Healthy,
    Degraded(i32),
    Banned,
}

impl HealthState {
    #[must_use]
    pub const fn of(failed_checks: i32, banned: bool) -> Self {
        if banned {
            Self::Banned
        } else if failed_checks <= 0 {
            Self::Healthy
        } else {
            Self::Degraded(failed_checks)
        }
    }

    #[must_use]
    pub const fn of_instance(instance: &instance::Model) -> Self {
        Self::of(instance.failed_checks, instance.banned)
    }
}

/// Health fields to persist after a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthUpdate {
    pub failed_checks: i32,
    pub banned: bool,
    pub ban_reason: Option<String>,
}

impl HealthUpdate {
    /// Compute the transition for one probe outcome.
    ///
    /// Returns `None` when nothing changes: a failed probe of an instance that is
    /// already banned.
    #[must_use]
    pub fn after_probe(failed_checks: i32, banned: bool, succeeded: bool) -> Option<Self> {
        if succeeded {
            return Some(Self {
                failed_checks: 0,
                banned: false,
                ban_reason: None,
            });
        }
        if banned {
            return None;
        }

        let failed_checks = failed_checks.max(0).saturating_add(1);
        if failed_checks >= MAX_FAILED_CHECKS {
            Some(Self {
                failed_checks,
                banned: true,
                ban_reason: Some(HEALTH_BAN_REASON.to_string()),
            })
        } else {
            Some(Self {
                failed_checks,
                banned: false,
                ban_reason: None,
            })
        }
    }

    #[must_use]
    pub const fn state(&self) -> HealthState {
        HealthState::of(self.failed_checks, self.banned)
    }
}
