//! Application wiring.
//!
//! `AppContext` builds the single `PlayerStore` and hands it to every
//! consumer together with the repositories and view models.

use std::{fs::create_dir_all, sync::Arc, time::Duration};

use {anyhow::Result, tracing::info};

use crate::{
    config::UserSettings,
    error::ResultExt,
    library::{LibraryScanner, MediaIndex, ScanSummary},
    player::{MediaSession, PlayerConfig, PlayerStore, SimulatedSession},
    repository::{LocalTrackRepository, RemoteTrackRepository},
    state::{list_view::TrackListViewModel, playback_view::PlaybackViewAdapter},
};

/// Length of every item played by the headless session (catalogue previews last 30 s).
pub const SIMULATED_TRACK_LENGTH: Duration = Duration::from_secs(30);

/// Everything the screens need, built once at startup.
pub struct AppContext {
    pub settings: UserSettings,
    pub index: Arc<MediaIndex>,
    pub player: Arc<PlayerStore>,
    pub local_repository: Arc<LocalTrackRepository>,
    pub remote_repository: Arc<RemoteTrackRepository>,
    /// Listing of on-device music.
    pub local_tracks: TrackListViewModel,
    /// Listing of the remote catalogue.
    pub remote_tracks: TrackListViewModel,
    pub playback: PlaybackViewAdapter,
}

impl AppContext {
    /// Opens the media index from `settings` and wires a simulated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, the index cannot be
    /// opened or the HTTP client cannot be built.
    pub async fn new(settings: UserSettings) -> Result<Self> {
        settings.validate().add_context("Invalid settings")?;

        let database_path = settings.database_path();
        if let Some(parent) = database_path.parent() {
            create_dir_all(parent)
                .add_contextf(format!("Failed to create {}", parent.display()))?;
        }
        let index = MediaIndex::open(&database_path)
            .await
            .add_contextf(format!(
                "Failed to open media index at {}",
                database_path.display()
            ))?;

        Self::with_parts(
            settings,
            Arc::new(index),
            SimulatedSession::new(SIMULATED_TRACK_LENGTH),
        )
    }

    /// Wires the context around an existing index and media session.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the HTTP client cannot be built.
    pub fn with_parts(
        settings: UserSettings,
        index: Arc<MediaIndex>,
        session: Arc<dyn MediaSession>,
    ) -> Result<Self> {
        settings.validate().add_context("Invalid settings")?;

        let player = PlayerStore::new(session, PlayerConfig::from(&settings));
        let local_repository = Arc::new(LocalTrackRepository::new(
            Arc::clone(&index),
            settings.page_size,
            settings.album_art_dir(),
        ));
        let remote_repository = Arc::new(
            RemoteTrackRepository::with_base_url(
                settings.api_base_url.clone(),
                settings.request_timeout(),
            )
            .add_context("Failed to create catalogue client")?,
        );

        let local_tracks = TrackListViewModel::new(local_repository.clone(), Arc::clone(&player));
        let remote_tracks =
            TrackListViewModel::new(remote_repository.clone(), Arc::clone(&player));
        let playback = PlaybackViewAdapter::new(Arc::clone(&player));

        info!(
            "Context ready: catalogue {}, page size {}",
            settings.api_base_url, settings.page_size
        );

        Ok(Self {
            settings,
            index,
            player,
            local_repository,
            remote_repository,
            local_tracks,
            remote_tracks,
            playback,
        })
    }

    /// Indexes the configured library directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be written.
    pub async fn scan_library(&self) -> Result<ScanSummary> {
        let scanner = LibraryScanner::new(Arc::clone(&self.index));
        let summary = scanner
            .scan_directories(&self.settings.library_directories)
            .await
            .add_context("Library scan failed")?;
        info!(
            "Library scan: {} indexed, {} skipped",
            summary.indexed, summary.skipped
        );
        Ok(summary)
    }
}
