//! On-device media index using sqlx with SQLite.
//!
//! This module provides the `MediaIndex` that answers paged "is music"
//! queries for the local track listing and receives rows from the scanner.

use std::path::Path;

use {sqlx::SqlitePool, tracing::debug};

use crate::{
    error::LibraryError,
    library::{
        models::{MediaRow, NewMediaEntry},
        schema::{SchemaManager, create_connection_pool, create_memory_pool},
    },
};

const SELECT_MUSIC: &str = r#"
    SELECT id, title, artist, path, album_id, album
    FROM media
    WHERE is_music != 0
    "#;

const FILTER_CLAUSE: &str = r#"
    AND (lower(title) LIKE ? ESCAPE '\' OR lower(artist) LIKE ? ESCAPE '\')
    "#;

const ORDER_AND_PAGE: &str = r#"
    ORDER BY date_added DESC, id DESC
    LIMIT ? OFFSET ?
    "#;

/// Main media index interface.
pub struct MediaIndex {
    pool: SqlitePool,
}

impl MediaIndex {
    /// Opens (or creates) the media index stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self, LibraryError> {
        debug!("Opening media index at {:?}", path);
        let pool = create_connection_pool(path).await?;
        Self::with_pool(pool).await
    }

    /// Creates an empty index held in memory.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the database cannot be initialized.
    pub async fn in_memory() -> Result<Self, LibraryError> {
        let pool = create_memory_pool().await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, LibraryError> {
        SchemaManager::new(pool.clone()).initialize_schema().await?;
        Ok(Self { pool })
    }

    /// Queries one page of music rows, newest first.
    ///
    /// # Arguments
    ///
    /// * `filter` - Optional case-insensitive substring matched against title or artist.
    /// * `limit` - Maximum number of rows.
    /// * `offset` - Number of rows to skip.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the query fails.
    pub async fn query_tracks(
        &self,
        filter: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MediaRow>, LibraryError> {
        let rows = match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(filter) => {
                let pattern = like_pattern(filter);
                let sql = format!("{SELECT_MUSIC}{FILTER_CLAUSE}{ORDER_AND_PAGE}");
                sqlx::query_as::<_, MediaRow>(&sql)
                    .bind(&pattern)
                    .bind(&pattern)
                    .bind(i64::from(limit))
                    .bind(i64::from(offset))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{SELECT_MUSIC}{ORDER_AND_PAGE}");
                sqlx::query_as::<_, MediaRow>(&sql)
                    .bind(i64::from(limit))
                    .bind(i64::from(offset))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    /// Inserts or updates the row for `entry.path`.
    ///
    /// # Returns
    ///
    /// The ID of the media row.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the entry is invalid or a statement fails.
    pub async fn upsert_track(&self, entry: &NewMediaEntry) -> Result<i64, LibraryError> {
        if entry.title.trim().is_empty() {
            return Err(LibraryError::InvalidData {
                reason: format!("missing title for {}", entry.path),
            });
        }

        sqlx::query("INSERT INTO albums (title) VALUES (?) ON CONFLICT(title) DO NOTHING")
            .bind(&entry.album)
            .execute(&self.pool)
            .await?;

        let album_id: i64 = sqlx::query_scalar("SELECT id FROM albums WHERE title = ?")
            .bind(&entry.album)
            .fetch_one(&self.pool)
            .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO media (title, artist, path, album_id, album, is_music, date_added)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album_id = excluded.album_id,
                album = excluded.album,
                is_music = excluded.is_music
            RETURNING id
            "#,
        )
        .bind(&entry.title)
        .bind(&entry.artist)
        .bind(&entry.path)
        .bind(album_id)
        .bind(&entry.album)
        .bind(entry.is_music)
        .bind(entry.date_added)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Counts the rows flagged as music.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the query fails.
    pub async fn count_music(&self) -> Result<i64, LibraryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media WHERE is_music != 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Builds a lower-cased `LIKE` pattern with wildcards in `filter` escaped.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
