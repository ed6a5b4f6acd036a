//! Directory writer: persists new instances and probe outcomes.

use chrono::Utc;
use fedidir_common::{AppError, AppResult, IdGenerator};
use fedidir_db::entities::{api_key, instance, instance_data, PlatformFamily};
use fedidir_db::repositories::{ApiKeyRepository, InstanceRepository};
use sea_orm::Set;
use thiserror::Error;
use tracing::{info, warn};

use super::health::{HealthState, HealthUpdate};
use super::probe::{InstanceSnapshot, ProbeFailure};

/// A submitted instance that passed probing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInstance {
    pub uri: String,
    pub platform: PlatformFamily,
    pub nsfw_flag: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateFailure {
    #[error("instance already exists")]
    Duplicate,

    #[error("{0}")]
    Invalid(String),
}

/// A probe outcome that could not be written.
#[derive(Debug, Error)]
#[error("failed to update instance {instance_id}: {source}")]
pub struct UpdateFailure {
    pub instance_id: String,
    #[source]
    pub source: AppError,
}

#[derive(Clone)]
pub struct DirectoryService {
    instance_repo: InstanceRepository,
    api_key_repo: ApiKeyRepository,
    id_gen: IdGenerator,
}

impl DirectoryService {
    #[must_use]
    pub const fn new(instance_repo: InstanceRepository, api_key_repo: ApiKeyRepository) -> Self {
        Self {
            instance_repo,
            api_key_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Mint a fresh access credential for a new instance.
    #[must_use]
    pub fn mint_credential(&self) -> String {
        self.id_gen.generate_token()
    }

    /// Insert the instance, its snapshot and its credential atomically.
    pub async fn create_instance(
        &self,
        candidate: &CandidateInstance,
        snapshot: &InstanceSnapshot,
        credential: &str,
    ) -> Result<instance::Model, CreateFailure> {
        let now = Utc::now().fixed_offset();
        let id = self.id_gen.generate();

        let instance = instance::ActiveModel {
            id: Set(id.clone()),
            uri: Set(candidate.uri.clone()),
            name: Set(snapshot.title.clone()),
            category: Set(candidate.category.clone()),
            platform: Set(candidate.platform),
            nsfw_flag: Set(candidate.nsfw_flag.clone()),
            verified: Set(false),
            failed_checks: Set(0),
            banned: Set(false),
            ban_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let data = snapshot_model(&id, snapshot);
        let key = api_key::ActiveModel {
            id: Set(self.id_gen.generate()),
            instance_id: Set(id),
            api_key: Set(credential.to_string()),
            created_at: Set(now),
        };

        match self.instance_repo.create_with_relations(instance, data, key).await {
            Ok(created) => {
                info!(instance_id = %created.id, uri = %created.uri, "Instance added to directory");
                Ok(created)
            }
            Err(AppError::Conflict(_)) => Err(CreateFailure::Duplicate),
            Err(e) => Err(CreateFailure::Invalid(e.to_string())),
        }
    }

    /// Apply one probe outcome to `instance`.
    ///
    /// Health fields and, on success, the snapshot are written together or not
    /// at all. A failed probe of an already banned instance writes nothing.
    pub async fn update_health_and_snapshot(
        &self,
        instance: &instance::Model,
        outcome: &Result<InstanceSnapshot, ProbeFailure>,
    ) -> Result<HealthState, UpdateFailure> {
        let Some(update) =
            HealthUpdate::after_probe(instance.failed_checks, instance.banned, outcome.is_ok())
        else {
            return Ok(HealthState::of_instance(instance));
        };

        let health = instance::ActiveModel {
            id: Set(instance.id.clone()),
            failed_checks: Set(update.failed_checks),
            banned: Set(update.banned),
            ban_reason: Set(update.ban_reason.clone()),
            updated_at: Set(Some(Utc::now().fixed_offset())),
            ..Default::default()
        };
        let data = outcome
            .as_ref()
            .ok()
            .map(|snapshot| snapshot_model(&instance.id, snapshot));

        self.instance_repo
            .apply_probe_result(health, data)
            .await
            .map_err(|source| UpdateFailure {
                instance_id: instance.id.clone(),
                source,
            })?;

        let state = update.state();
        if state == HealthState::Banned && !instance.banned {
            warn!(instance_id = %instance.id, uri = %instance.uri, "Instance banned after repeated failed checks");
        }
        Ok(state)
    }

    /// The access credential minted for `instance_id`, if any.
    pub async fn find_credential(&self, instance_id: &str) -> AppResult<Option<String>> {
        Ok(self
            .api_key_repo
            .find_by_instance_id(instance_id)
            .await?
            .map(|key| key.api_key))
    }

    pub async fn list_health_banned(&self) -> AppResult<Vec<instance::Model>> {
        self.instance_repo.find_health_banned().await
    }

    pub async fn list_active(&self) -> AppResult<Vec<instance::Model>> {
        self.instance_repo.find_active().await
    }
}

fn snapshot_model(instance_id: &str, snapshot: &InstanceSnapshot) -> instance_data::ActiveModel {
    instance_data::ActiveModel {
        instance_id: Set(instance_id.to_string()),
        title: Set(snapshot.title.clone()),
        description: Set(snapshot.description.clone()),
        thumbnail: Set(snapshot.thumbnail_url.clone()),
        user_count: Set(i64::try_from(snapshot.user_count).unwrap_or(i64::MAX)),
        status_count: Set(i64::try_from(snapshot.status_count).unwrap_or(i64::MAX)),
        contact_handle: Set(snapshot.contact_handle.clone()),
        registrations: Set(snapshot.registrations_open),
        approval_required: Set(snapshot.approval_required),
        updated_at: Set(Utc::now().fixed_offset()),
    }
}
