//! Repository over the on-device media index.

use std::{fs::File, path::PathBuf, sync::Arc};

use {async_trait::async_trait, parking_lot::Mutex, tracing::debug};

use crate::{
    error::DataFetchError,
    library::{MediaIndex, MediaRow, Track},
    repository::{TrackCache, TrackRepository, validate_query},
};

/// Cover art file extensions tried for an album, in order.
const ALBUM_ART_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Offset into the index plus the query the offset belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LocalCursor {
    offset: u32,
    query: Option<String>,
}

/// Paged access to local music, newest first.
pub struct LocalTrackRepository {
    index: Arc<MediaIndex>,
    page_size: u32,
    album_art_dir: PathBuf,
    cache: Mutex<TrackCache<LocalCursor>>,
}

impl LocalTrackRepository {
    /// Creates a repository reading `page_size` rows at a time from `index`.
    ///
    /// Cover art is looked up as `<album_art_dir>/<album_id>.jpg` (or `.png`).
    #[must_use]
    pub fn new(index: Arc<MediaIndex>, page_size: u32, album_art_dir: PathBuf) -> Self {
        Self {
            index,
            page_size: page_size.max(1),
            album_art_dir,
            cache: Mutex::new(TrackCache::default()),
        }
    }

    async fn fetch_page(
        &self,
        query: Option<&str>,
        offset: u32,
    ) -> Result<Vec<Track>, DataFetchError> {
        let rows = self.index.query_tracks(query, self.page_size, offset).await?;
        Ok(rows.into_iter().map(|row| self.to_track(row)).collect())
    }

    fn to_track(&self, row: MediaRow) -> Track {
        Track {
            id: row.id,
            title: row.title,
            artist: row.artist,
            media_uri: row.path,
            album_title: row.album,
            album_cover_uri: self.album_art_uri(row.album_id),
        }
    }

    /// Locator of the album's cover, present only if the file can be opened.
    fn album_art_uri(&self, album_id: i64) -> Option<String> {
        ALBUM_ART_EXTENSIONS.iter().find_map(|ext| {
            let candidate = self.album_art_dir.join(format!("{album_id}.{ext}"));
            File::open(&candidate)
                .ok()
                .map(|_| candidate.to_string_lossy().into_owned())
        })
    }
}

#[async_trait]
impl TrackRepository for LocalTrackRepository {
    async fn get_tracks(&self) -> Result<Vec<Track>, DataFetchError> {
        let tracks = self.fetch_page(None, 0).await?;
        debug!("Local listing: {} tracks in first page", tracks.len());
        Ok(self.cache.lock().replace(LocalCursor::default(), tracks))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, DataFetchError> {
        let query = validate_query(query)?;
        let tracks = self.fetch_page(Some(query), 0).await?;
        debug!("Local search {:?}: {} tracks in first page", query, tracks.len());

        let cursor = LocalCursor {
            offset: 0,
            query: Some(query.to_string()),
        };
        Ok(self.cache.lock().replace(cursor, tracks))
    }

    async fn load_next(&self) -> Result<Vec<Track>, DataFetchError> {
        let cursor = self.cache.lock().cursor.clone();
        let next = LocalCursor {
            offset: cursor.offset + self.page_size,
            query: cursor.query.clone(),
        };

        let page = self.fetch_page(next.query.as_deref(), next.offset).await?;

        let mut cache = self.cache.lock();
        if page.is_empty() {
            debug!("Local listing exhausted at offset {}", next.offset);
            return Ok(cache.tracks.clone());
        }
        if cache.cursor != cursor {
            debug!("Local query changed while loading the next page, dropping it");
            return Ok(cache.tracks.clone());
        }
        Ok(cache.append(next, page))
    }

    fn cached_tracks(&self) -> Vec<Track> {
        self.cache.lock().tracks.clone()
    }
}
