//! SQLite-based unified store using `SeaORM`.
//!
//! A single `SqliteStore` implements `TargetRepository`, `SubdomainRepository`
//! and `ScanRunRepository`, backed by a local `SQLite` database. Timestamps are
//! stored as fixed-width RFC3339 strings, so due and stale queries compare them
//! lexically.

mod scan_run_repo;
mod subdomain_repo;
mod target_repo;
pub(crate) mod entity;
mod migration;

use std::path::Path;

use sea_orm::{Database, DatabaseConnection, DbErr, SqlErr};
use sea_orm_migration::MigratorTrait;
use subwatch_core::error::{CoreError, CoreResult};

use migration::Migrator;

/// SQLite-based unified store.
///
/// Every compare-and-set is a conditional `UPDATE` checked through
/// `rows_affected`; changes spanning a run and its target share one transaction.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
}

impl SqliteStore {
    /// Create a new `SQLite` store.
    ///
    /// - `db_path`: Path to the `SQLite` database file (created if not exists).
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if directory creation, database
    /// connection, or schema migration fails.
    pub async fn new(db_path: &Path) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        Self::connect(&db_url).await
    }

    /// Connect to an explicit `SQLite` URL (e.g. `sqlite::memory:`) and migrate.
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if connection or migration fails.
    pub async fn connect(db_url: &str) -> CoreResult<Self> {
        let db = Database::connect(db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self { db };

        // Ensure schema is up to date before the store is used.
        Migrator::up(&store.db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;

        log::info!("SQLite store ready at {db_url}");
        Ok(store)
    }
}

/// Map a `SeaORM` error to `StorageError` with context.
pub(crate) fn storage_error(action: &'static str) -> impl FnOnce(DbErr) -> CoreError {
    move |e| CoreError::StorageError(format!("Failed to {action}: {e}"))
}

/// Whether the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Whether the error is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
