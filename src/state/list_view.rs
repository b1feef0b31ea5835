//! View-state machine of a paginated track listing.
//!
//! One [`TrackListViewModel`] backs one listing screen. It turns repository
//! results into [`ListViewState`] values and overlays the current playback
//! state from the shared [`PlayerStore`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    parking_lot::Mutex,
    tokio::{
        spawn,
        sync::watch::{Receiver, Sender},
        task::JoinHandle,
    },
    tracing::debug,
};

use crate::{
    error::{DataFetchError, ErrorReporter},
    library::Track,
    player::{PlayerState, PlayerStore},
    repository::TrackRepository,
};

/// What a listing screen renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListViewState {
    /// A query is in flight.
    #[default]
    Loading,
    /// The listing has at least one track.
    Success {
        tracks: Vec<Track>,
        /// Track the player is on, if any.
        current_track: Option<Track>,
        is_playing: bool,
        /// A follow-up page is being fetched.
        is_loading_next: bool,
    },
    /// The query matched nothing.
    Empty,
    /// The last fetch failed.
    Error { message: String },
}

impl ListViewState {
    /// Tracks currently displayed, empty outside `Success`.
    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        match self {
            Self::Success { tracks, .. } => tracks.as_slice(),
            _ => &[],
        }
    }
}

struct Inner {
    repository: Arc<dyn TrackRepository>,
    player: Arc<PlayerStore>,
    state: Sender<ListViewState>,
    /// Bumped by every new query; results of older queries are discarded.
    generation: AtomicU64,
}

impl Inner {
    fn publish(
        &self,
        generation: u64,
        result: Result<Vec<Track>, DataFetchError>,
        context: &str,
    ) {
        let result = result.map_err(|error| {
            ErrorReporter::warn(&error, context);
            ErrorReporter::to_user_message(&error)
        });

        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            // Player snapshot taken under the listing lock so a concurrent
            // player update is either seen here or by `observe_player`.
            *state = match result {
                Ok(tracks) if tracks.is_empty() => ListViewState::Empty,
                Ok(tracks) => {
                    let player = self.player.state();
                    ListViewState::Success {
                        tracks,
                        current_track: player.current_track().cloned(),
                        is_playing: player.is_playing,
                        is_loading_next: false,
                    }
                }
                Err(message) => ListViewState::Error { message },
            };
            true
        });
        if !published {
            debug!("Discarding result of superseded query {}", generation);
        }
    }
}

async fn observe_player(inner: Arc<Inner>, mut player: Receiver<PlayerState>) {
    while player.changed().await.is_ok() {
        let (playing_track, playing) = {
            let state = player.borrow_and_update();
            (state.current_track().cloned(), state.is_playing)
        };
        inner.state.send_if_modified(|state| {
            let ListViewState::Success {
                current_track,
                is_playing,
                ..
            } = state
            else {
                return false;
            };
            let changed = *current_track != playing_track || *is_playing != playing;
            *current_track = playing_track;
            *is_playing = playing;
            changed
        });
    }
}

/// Drives one listing screen.
pub struct TrackListViewModel {
    inner: Arc<Inner>,
    query_task: Mutex<Option<JoinHandle<()>>>,
    next_task: Mutex<Option<JoinHandle<()>>>,
    observer: JoinHandle<()>,
}

impl TrackListViewModel {
    /// Creates a view model in the `Loading` state.
    ///
    /// Must be called within a tokio runtime; the player observer starts immediately.
    #[must_use]
    pub fn new(repository: Arc<dyn TrackRepository>, player: Arc<PlayerStore>) -> Self {
        let player_updates = player.subscribe();
        let inner = Arc::new(Inner {
            repository,
            player,
            state: Sender::new(ListViewState::Loading),
            generation: AtomicU64::new(0),
        });
        let observer = spawn(observe_player(Arc::clone(&inner), player_updates));

        Self {
            inner,
            query_task: Mutex::new(None),
            next_task: Mutex::new(None),
            observer,
        }
    }

    /// Current view state.
    #[must_use]
    pub fn state(&self) -> ListViewState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to view state changes.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ListViewState> {
        self.inner.state.subscribe()
    }

    /// Loads the first page of the unfiltered listing.
    pub fn load_tracks(&self) {
        self.start_query(None);
    }

    /// Loads the first page matching `query`; blank queries reload the listing.
    pub fn search_tracks(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.load_tracks();
        } else {
            self.start_query(Some(query.to_string()));
        }
    }

    fn start_query(&self, query: Option<String>) {
        if let Some(task) = self.next_task.lock().take() {
            task.abort();
        }
        let mut query_task = self.query_task.lock();
        if let Some(task) = query_task.take() {
            task.abort();
        }

        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ListViewState::Loading;
        });
        debug!("Query {} started: {:?}", generation, query);

        let inner = Arc::clone(&self.inner);
        *query_task = Some(spawn(async move {
            let result = match &query {
                Some(query) => inner.repository.search_tracks(query).await,
                None => inner.repository.get_tracks().await,
            };
            inner.publish(generation, result, "Failed to load tracks");
        }));
    }

    /// Appends the next page.
    ///
    /// Ignored unless the listing is in `Success` with no page already loading.
    pub fn load_next(&self) {
        let mut generation = 0;
        let started = self.inner.state.send_if_modified(|state| match state {
            ListViewState::Success {
                is_loading_next, ..
            } if !*is_loading_next => {
                *is_loading_next = true;
                generation = self.inner.generation.load(Ordering::SeqCst);
                true
            }
            _ => false,
        });
        if !started {
            debug!("Ignoring load_next: no idle listing");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let task = spawn(async move {
            let result = inner.repository.load_next().await;
            inner.publish(generation, result, "Failed to load next page");
        });
        if let Some(previous) = self.next_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Plays the displayed listing starting at `index`.
    pub fn track_clicked(&self, index: usize) {
        let tracks = self.inner.state.borrow().tracks().to_vec();
        if let Err(error) = self.inner.player.set_playlist(tracks, index) {
            ErrorReporter::warn(&error, "Failed to start playback");
        }
    }

    /// Pauses when playing, plays otherwise.
    pub fn toggle_playback(&self) {
        self.inner.player.toggle_playback();
    }

    /// Whether `track` is the one the player is on.
    #[must_use]
    pub fn is_current_track(&self, track: &Track) -> bool {
        self.inner.player.state().current_track() == Some(track)
    }
}

impl Drop for TrackListViewModel {
    fn drop(&mut self) {
        self.observer.abort();
        if let Some(task) = self.query_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.next_task.lock().take() {
            task.abort();
        }
    }
}
