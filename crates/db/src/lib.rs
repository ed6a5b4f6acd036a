//! Persistence for the instance directory.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use fedidir_common::{config::DatabaseConfig, AppResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use migrations::Migrator;
use repositories::map_db_err;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the connection pool.
pub async fn init(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.as_str());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(CONNECT_TIMEOUT)
        .acquire_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options).await.map_err(map_db_err)?;
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    let pending = Migrator::get_pending_migrations(db).await.map_err(map_db_err)?;
    if pending.is_empty() {
        return Ok(());
    }

    info!(count = pending.len(), "Applying schema migrations");
    Migrator::up(db, None).await.map_err(map_db_err)
}
