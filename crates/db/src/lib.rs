//! Persistence for the playout engine.
//!
//! - [`store::DocumentStore`]: the seam to the persistence engine, with a
//!   PostgreSQL implementation ([`postgres::PgDocumentStore`]) and an
//!   in-memory one for tests ([`memory::MemoryDocumentStore`]).
//! - [`cache`]: the per-job versioned cache with diff-based flush.

use sqlx::postgres::PgPoolOptions;

pub mod cache;
pub mod documents;
pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{ArchivedFilter, Collection, DocumentQuery, DocumentStore, StoreError, StoredDocument, WriteOp};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
