//! Database errors

use thiserror::Error;
use uuid::Uuid;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Row was modified since it was read
    #[error("version conflict on {id}: expected version {expected}")]
    VersionConflict {
        /// Row ID
        id: Uuid,
        /// Version the writer read
        expected: i64,
    },

    /// Row contents could not be mapped to a domain value
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Result alias for repository operations
pub type DbResult<T> = Result<T, DbError>;
