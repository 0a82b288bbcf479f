//! Orchard DB - Storage abstractions
//!
//! Async repository traits consumed by the scheduling core, plus their
//! SQLx/PostgreSQL implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use orchard_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/orchard").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let sub = repos.subscriptions.find_by_id(id).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;

/// Underlying driver error, for callers that need to construct one
pub use sqlx::Error as SqlxError;
