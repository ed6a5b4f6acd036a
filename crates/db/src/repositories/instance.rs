//! Instance repository for the directory.

use std::sync::Arc;

use crate::entities::{api_key, instance, instance_data, Instance};
use fedidir_common::{AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::map_db_err;

/// Ban reason recorded when an instance fails too many consecutive health probes.
/// Retry sweeps only select instances carrying exactly this reason.
pub const HEALTH_BAN_REASON: &str = "Instance failed 5 checks in a row";

/// Instance repository for database operations.
#[derive(Clone)]
pub struct InstanceRepository {
    db: Arc<DatabaseConnection>,
}

impl InstanceRepository {
    /// Create a new instance repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List instances banned by the health check, eligible for a retry sweep.
    pub async fn find_health_banned(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .filter(instance::Column::Banned.eq(true))
            .filter(instance::Column::BanReason.eq(HEALTH_BAN_REASON))
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List instances that are not banned.
    pub async fn find_active(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .filter(instance::Column::Banned.eq(false))
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create an instance together with its snapshot and access credential.
    ///
    /// All three rows are written in one transaction. An existing row with the
    /// same `uri` yields [`AppError::Conflict`], as does a unique-key violation
    /// raised by a concurrent insert.
    pub async fn create_with_relations(
        &self,
        instance: instance::ActiveModel,
        data: instance_data::ActiveModel,
        key: api_key::ActiveModel,
    ) -> AppResult<instance::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let uri = match &instance.uri {
            ActiveValue::Set(uri) | ActiveValue::Unchanged(uri) => uri.clone(),
            ActiveValue::NotSet => {
                return Err(AppError::Validation("Instance uri is required".to_string()));
            }
        };
        let existing = Instance::find()
            .filter(instance::Column::Uri.eq(uri.as_str()))
            .one(&txn)
            .await
            .map_err(map_db_err)?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!("Instance already exists: {uri}")));
        }

        let mut created = instance.insert(&txn).await.map_err(map_db_err)?;
        data.insert(&txn).await.map_err(map_db_err)?;
        key.insert(&txn).await.map_err(map_db_err)?;

        // Re-assert the unverified state regardless of column defaults.
        Instance::update_many()
            .col_expr(instance::Column::Verified, Expr::value(false))
            .filter(instance::Column::Id.eq(created.id.as_str()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        created.verified = false;

        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(instance_id = %created.id, uri = %created.uri, "Instance created");
        Ok(created)
    }

    /// Write health fields and, when present, a fresh snapshot in one transaction.
    pub async fn apply_probe_result(
        &self,
        health: instance::ActiveModel,
        data: Option<instance_data::ActiveModel>,
    ) -> AppResult<instance::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        if let Some(data) = data {
            data.update(&txn).await.map_err(map_db_err)?;
        }
        let updated = health.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(updated)
    }
}
