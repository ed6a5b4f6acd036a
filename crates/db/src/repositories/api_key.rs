//! Access credential repository.

use std::sync::Arc;

use crate::entities::{api_key, ApiKey};
use fedidir_common::AppResult;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use super::map_db_err;

/// Repository for per-instance access credentials.
#[derive(Clone)]
pub struct ApiKeyRepository {
    db: Arc<DatabaseConnection>,
}

impl ApiKeyRepository {
    /// Create a new API key repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the credential minted for an instance.
    pub async fn find_by_instance_id(&self, instance_id: &str) -> AppResult<Option<api_key::Model>> {
        ApiKey::find()
            .filter(api_key::Column::InstanceId.eq(instance_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_key(instance_id: &str) -> api_key::Model {
        api_key::Model {
            id: format!("key-{instance_id}"),
            instance_id: instance_id.to_string(),
            api_key: "0123456789abcdef0123456789abcdef".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_instance_id_found() {
        let key = create_test_key("inst1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[key.clone()]])
                .into_connection(),
        );

        let repo = ApiKeyRepository::new(db);
        let found = repo.find_by_instance_id("inst1").await.unwrap();

        assert_eq!(found, Some(key));
    }

    #[tokio::test]
    async fn test_find_by_instance_id_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<api_key::Model>::new()])
                .into_connection(),
        );

        let repo = ApiKeyRepository::new(db);
        let found = repo.find_by_instance_id("nope").await.unwrap();

        assert!(found.is_none());
    }
}
