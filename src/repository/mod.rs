//! Track repositories.
//!
//! A repository fetches, searches and paginates track metadata from one
//! source. Two implementations exist: [`LocalTrackRepository`] over the
//! on-device media index and [`RemoteTrackRepository`] over the HTTP
//! catalogue.
//!
//! Calls on one repository are not meant to overlap: callers gate
//! `load_next` behind an in-flight flag and cancel a running search before
//! starting the next one. Every operation finishes its fetch before touching
//! the cursor and cache, so a cancelled (dropped) call leaves both in their
//! last-known-good state.

use async_trait::async_trait;

use crate::{error::DataFetchError, library::Track};

pub mod local;
pub mod remote;

pub use {local::LocalTrackRepository, remote::RemoteTrackRepository};

/// Uniform contract of the local and remote track sources.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Resets the cursor and returns the first page of the unfiltered listing.
    async fn get_tracks(&self) -> Result<Vec<Track>, DataFetchError>;

    /// Resets the cursor and returns the first page matching `query`.
    ///
    /// Blank queries are rejected with `DataFetchError::InvalidQuery`.
    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, DataFetchError>;

    /// Appends the next page to the cache and returns the whole cache.
    ///
    /// Once the cursor is exhausted this returns the unchanged cache.
    async fn load_next(&self) -> Result<Vec<Track>, DataFetchError>;

    /// Last committed cache.
    fn cached_tracks(&self) -> Vec<Track>;
}

/// Accumulated pages of the current query and the cursor to continue it.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TrackCache<C> {
    pub(crate) cursor: C,
    pub(crate) tracks: Vec<Track>,
}

impl<C> TrackCache<C> {
    /// Starts a fresh query.
    pub(crate) fn replace(&mut self, cursor: C, tracks: Vec<Track>) -> Vec<Track> {
        self.cursor = cursor;
        self.tracks = tracks;
        self.tracks.clone()
    }

    /// Appends a page fetched for the current query.
    pub(crate) fn append(&mut self, cursor: C, tracks: Vec<Track>) -> Vec<Track> {
        self.cursor = cursor;
        self.tracks.extend(tracks);
        self.tracks.clone()
    }
}

/// Rejects blank search queries.
pub(crate) fn validate_query(query: &str) -> Result<&str, DataFetchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(DataFetchError::InvalidQuery)
    } else {
        Ok(trimmed)
    }
}
