//! Database schema definition and versioning for the media index.
//!
//! This module defines the SQLite schema of the on-device media index and
//! provides schema versioning for future migrations.

use std::path::Path;

use {
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    },
    thiserror::Error,
    tracing::debug,
};

/// Error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),
    /// Schema migration error.
    #[error("Schema migration error: {reason}")]
    MigrationError { reason: String },
}

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Database schema definition.
pub struct SchemaManager {
    pool: SqlitePool,
}

impl SchemaManager {
    /// Creates a new schema manager.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initializes the database schema.
    ///
    /// Creates all tables on a fresh database and checks the stored version
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if schema initialization fails or the stored
    /// version cannot be migrated.
    pub async fn initialize_schema(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let current_version: Option<i32> =
            sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match current_version {
            None => {
                debug!("Creating media index schema v{}", CURRENT_SCHEMA_VERSION);
                self.create_tables().await?;
                sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                    .bind(CURRENT_SCHEMA_VERSION)
                    .execute(&self.pool)
                    .await?;
            }
            Some(version) if version == CURRENT_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(SchemaError::MigrationError {
                    reason: format!("Schema migration from version {version} not implemented"),
                });
            }
        }

        Ok(())
    }

    async fn create_tables(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE albums (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT NOT NULL DEFAULT '',
                path TEXT NOT NULL UNIQUE,
                album_id INTEGER NOT NULL,
                album TEXT NOT NULL DEFAULT '',
                is_music BOOLEAN NOT NULL DEFAULT TRUE,
                date_added INTEGER NOT NULL,
                FOREIGN KEY (album_id) REFERENCES albums (id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX idx_media_date_added ON media (date_added)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX idx_media_album_id ON media (album_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets the current schema version, or 0 if not initialized.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the version table cannot be read.
    pub async fn get_current_version(&self) -> Result<i32, SchemaError> {
        let version: Option<i32> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(version.unwrap_or(0))
    }
}

/// Creates a connection pool for the database file at `path`.
///
/// # Errors
///
/// Returns `SchemaError` if the pool cannot be created.
pub async fn create_connection_pool(path: &Path) -> Result<SqlitePool, SchemaError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SchemaError::MigrationError {
            reason: format!("Cannot create database directory: {e}"),
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Creates a single-connection pool over a private in-memory database.
///
/// # Errors
///
/// Returns `SchemaError` if the connection cannot be opened.
pub async fn create_memory_pool() -> Result<SqlitePool, SchemaError> {
    let options = SqliteConnectOptions::new().in_memory(true);

    // Every connection would see its own empty database, so keep exactly one alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use crate::library::schema::{
        CURRENT_SCHEMA_VERSION, SchemaError, SchemaManager, create_memory_pool,
    };

    #[test]
    fn test_schema_error_display() {
        let migration_error = SchemaError::MigrationError {
            reason: "test error".to_string(),
        };
        assert_eq!(
            migration_error.to_string(),
            "Schema migration error: test error"
        );
    }

    #[tokio::test]
    async fn test_initialize_schema_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        let manager = SchemaManager::new(pool);

        // No version table yet.
        assert!(manager.get_current_version().await.is_err());
        manager.initialize_schema().await.unwrap();
        manager.initialize_schema().await.unwrap();
        assert_eq!(
            manager.get_current_version().await.unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let pool = create_memory_pool().await.unwrap();
        let manager = SchemaManager::new(pool.clone());
        manager.initialize_schema().await.unwrap();

        sqlx::query("UPDATE schema_version SET version = 99")
            .execute(&pool)
            .await
            .unwrap();

        let result = manager.initialize_schema().await;
        assert!(matches!(result, Err(SchemaError::MigrationError { .. })));
    }
}
