//! Tuneline - Playback state synchronization and paginated track listings
//!
//! Tuneline bridges a background media session to observable listing and
//! "now playing" state. Tracks come from two independent sources: an
//! on-device media index backed by SQLite and a remote HTTP catalogue.
//! A single `PlayerStore` owns the playback state; every listing screen
//! and the player screen consume it through watch channels.

pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod player;
pub mod repository;
pub mod state;

// Re-export key types for convenience
pub use {
    config::{SettingsManager, UserSettings},
    error::{DataFetchError, LibraryError, PlayerError},
    library::{LibraryScanner, MediaIndex, Track},
    player::{MediaSession, PlayerState, PlayerStore, SessionEvent, SimulatedSession},
    repository::{LocalTrackRepository, RemoteTrackRepository, TrackRepository},
    state::{
        AppContext, ListViewState, PlaybackViewAdapter, PlaybackViewState, TrackListViewModel,
    },
};
