//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p fedidir-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `fedidir_test`)
//!   `TEST_DB_PASSWORD` (default: `fedidir_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use fedidir_common::AppError;
use fedidir_db::entities::{api_key, instance, instance_data, PlatformFamily};
use fedidir_db::repositories::{ApiKeyRepository, InstanceRepository, HEALTH_BAN_REASON};
use fedidir_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;

fn new_rows(
    id: &str,
    uri: &str,
    key: &str,
) -> (instance::ActiveModel, instance_data::ActiveModel, api_key::ActiveModel) {
    let now = Utc::now().fixed_offset();
    (
        instance::ActiveModel {
            id: Set(id.to_string()),
            uri: Set(uri.to_string()),
            name: Set("Example".to_string()),
            category: Set(None),
            platform: Set(PlatformFamily::Mastodon),
            nsfw_flag: Set("sfw".to_string()),
            verified: Set(false),
            failed_checks: Set(0),
            banned: Set(false),
            ban_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        },
        instance_data::ActiveModel {
            instance_id: Set(id.to_string()),
            title: Set("Example".to_string()),
            description: Set("hi".to_string()),
            thumbnail: Set(None),
            user_count: Set(10),
            status_count: Set(20),
            contact_handle: Set("admin".to_string()),
            registrations: Set(true),
            approval_required: Set(false),
            updated_at: Set(now),
        },
        api_key::ActiveModel {
            id: Set(format!("key-{id}")),
            instance_id: Set(id.to_string()),
            api_key: Set(key.to_string()),
            created_at: Set(now),
        },
    )
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(config.database_url().starts_with("postgres://"));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_create_and_duplicate() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(db.connection().clone());
    let repo = InstanceRepository::new(conn.clone());
    let keys = ApiKeyRepository::new(conn);

    let (i, d, k) = new_rows("inst1", "example.social", "key-one");
    let created = repo.create_with_relations(i, d, k).await.unwrap();
    assert!(!created.verified);

    let (i, d, k) = new_rows("inst2", "example.social", "key-two");
    let second = repo.create_with_relations(i, d, k).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    assert!(keys.find_by_instance_id("inst2").await.unwrap().is_none());
    let key = keys.find_by_instance_id("inst1").await.unwrap().unwrap();
    assert_eq!(key.api_key, "key-one");

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_health_banned_selection() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let repo = InstanceRepository::new(Arc::new(db.connection().clone()));

    for (id, uri) in [("a", "a.example"), ("b", "b.example"), ("c", "c.example")] {
        let (i, d, k) = new_rows(id, uri, &format!("key-{id}"));
        repo.create_with_relations(i, d, k).await.unwrap();
    }

    let ban = |id: &str, reason: &str| instance::ActiveModel {
        id: Set(id.to_string()),
        failed_checks: Set(5),
        banned: Set(true),
        ban_reason: Set(Some(reason.to_string())),
        ..Default::default()
    };
    repo.apply_probe_result(ban("a", HEALTH_BAN_REASON), None)
        .await
        .unwrap();
    repo.apply_probe_result(ban("b", "Manual moderation"), None)
        .await
        .unwrap();

    let banned = repo.find_health_banned().await.unwrap();
    assert_eq!(banned.len(), 1);
    assert_eq!(banned[0].id, "a");

    let active = repo.find_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "c");

    db.drop_database().await.unwrap();
}
