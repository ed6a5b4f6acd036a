//! Repositories for database access.

pub mod api_key;
pub mod instance;

pub use api_key::ApiKeyRepository;
pub use instance::{InstanceRepository, HEALTH_BAN_REASON};

use fedidir_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Convert a database error, surfacing unique-key violations as conflicts.
pub(crate) fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}
