//! Repository over the remote HTTP catalogue.
//!
//! Pagination follows the opaque `next` URL returned with every page; an
//! absent `next` means the listing is exhausted.

use std::time::Duration;

use {async_trait::async_trait, parking_lot::Mutex, tracing::debug};

use crate::{
    error::DataFetchError,
    library::Track,
    repository::{TrackCache, TrackRepository, validate_query},
};

pub mod api;
pub mod models;

pub use {
    api::TrackApi,
    models::{ApiTrack, ChartResponse, TracksData},
};

/// Paged access to the remote catalogue.
pub struct RemoteTrackRepository {
    api: TrackApi,
    cache: Mutex<TrackCache<Option<String>>>,
}

impl RemoteTrackRepository {
    /// Creates a repository using `api`.
    #[must_use]
    pub fn new(api: TrackApi) -> Self {
        Self {
            api,
            cache: Mutex::new(TrackCache::default()),
        }
    }

    /// Creates a repository for the catalogue at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DataFetchError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataFetchError> {
        Ok(Self::new(TrackApi::new(base_url, timeout)?))
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.cache.lock().cursor.is_some()
    }
}

#[async_trait]
impl TrackRepository for RemoteTrackRepository {
    async fn get_tracks(&self) -> Result<Vec<Track>, DataFetchError> {
        let (tracks, next) = self.api.chart().await?.into_tracks();
        debug!("Chart: {} tracks, more: {}", tracks.len(), next.is_some());
        Ok(self.cache.lock().replace(next, tracks))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, DataFetchError> {
        let query = validate_query(query)?;
        let (tracks, next) = self.api.search(query).await?.into_tracks();
        debug!(
            "Remote search {:?}: {} tracks, more: {}",
            query,
            tracks.len(),
            next.is_some()
        );
        Ok(self.cache.lock().replace(next, tracks))
    }

    async fn load_next(&self) -> Result<Vec<Track>, DataFetchError> {
        let cursor = self.cache.lock().cursor.clone();
        let Some(url) = cursor else {
            return Ok(self.cached_tracks());
        };

        let (tracks, next) = self.api.page(&url).await?.into_tracks();

        let mut cache = self.cache.lock();
        if cache.cursor.as_deref() != Some(url.as_str()) {
            debug!("Remote query changed while loading the next page, dropping it");
            return Ok(cache.tracks.clone());
        }
        Ok(cache.append(next, tracks))
    }

    fn cached_tracks(&self) -> Vec<Track> {
        self.cache.lock().tracks.clone()
    }
}
