//! Single source of truth for playback.
//!
//! `PlayerStore` issues commands to a [`MediaSession`] and mirrors the
//! session's callbacks into a [`PlayerState`] published over a `watch`
//! channel. Two background tasks run for the lifetime of the store: one
//! consuming session events and one polling playback progress.

use std::{sync::Arc, time::Duration};

use {
    parking_lot::Mutex,
    tokio::{
        spawn,
        sync::{
            broadcast::{self, error::RecvError},
            watch::{Receiver, Sender},
        },
        task::JoinHandle,
        time::{MissedTickBehavior, interval, sleep},
    },
    tracing::{debug, warn},
};

use crate::{
    config::UserSettings,
    error::PlayerError,
    library::Track,
    player::{
        session::{MediaItem, MediaSession, PlaybackStatus, SessionEvent},
        state::{PlayerState, progress_fraction},
    },
};

/// Timing parameters of the store's background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Period of the progress polling loop.
    pub progress_poll_interval: Duration,
    /// Wait before the second attempt to read an unknown duration.
    pub duration_retry_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            progress_poll_interval: Duration::from_millis(200),
            duration_retry_delay: Duration::from_millis(200),
        }
    }
}

impl From<&UserSettings> for PlayerConfig {
    fn from(settings: &UserSettings) -> Self {
        Self {
            progress_poll_interval: settings.progress_poll_interval(),
            duration_retry_delay: settings.duration_retry_delay(),
        }
    }
}

/// State reachable from the background tasks.
struct Shared {
    session: Arc<dyn MediaSession>,
    state: Sender<PlayerState>,
    config: PlayerConfig,
}

impl Shared {
    fn handle_event(self: &Arc<Self>, event: &SessionEvent) {
        match event {
            SessionEvent::PlaybackStateChanged(status) => {
                let is_playing =
                    *status == PlaybackStatus::Ready && self.session.play_when_ready();
                debug!("Session status {:?}, playing: {}", status, is_playing);
                self.state.send_if_modified(|state| {
                    let changed = state.is_playing != is_playing;
                    state.is_playing = is_playing;
                    changed
                });
            }
            SessionEvent::MediaItemTransition { .. } => {
                self.sync_current_index();
                self.spawn_duration_refresh();
            }
            SessionEvent::Events => {
                if self.session.playback_status() == PlaybackStatus::Ready {
                    let is_playing = self.session.is_playing();
                    self.state.send_if_modified(|state| {
                        let changed = state.is_playing != is_playing;
                        state.is_playing = is_playing;
                        changed
                    });
                }
                self.sync_current_index();
                self.spawn_duration_refresh();
            }
        }
    }

    fn sync_current_index(&self) {
        let reported = self.session.current_item_index();
        self.state.send_if_modified(|state| {
            let index = state.checked_index(reported);
            if index != reported {
                debug!("Session index {:?} is outside the playlist", reported);
            }
            let changed = state.current_index != index;
            state.current_index = index;
            changed
        });
    }

    fn spawn_duration_refresh(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        spawn(async move { shared.refresh_duration().await });
    }

    async fn refresh_duration(&self) {
        let index = self.session.current_item_index();
        let duration = match self.session.duration_ms() {
            Some(duration) => Some(duration),
            None => {
                sleep(self.config.duration_retry_delay).await;
                self.session.duration_ms()
            }
        };

        if self.session.current_item_index() != index {
            debug!("Item changed while reading its duration, discarding");
            return;
        }

        let duration_ms = duration.unwrap_or_else(|| {
            debug!("Duration still unknown for item {:?}", index);
            0
        });
        self.state.send_if_modified(|state| {
            let changed = state.duration_ms != duration_ms;
            state.duration_ms = duration_ms;
            changed
        });
    }

    fn poll_progress(&self) {
        let should_poll = {
            let state = self.state.borrow();
            state.is_playing && !state.is_slider_moving
        };
        if !should_poll {
            return;
        }

        let position_ms = self.session.current_position_ms();
        self.state.send_if_modified(|state| {
            // A drag may have started since the check above. Without a known
            // duration any position would read as a full bar.
            if state.is_slider_moving || state.duration_ms == 0 {
                return false;
            }
            let progress = progress_fraction(position_ms, state.duration_ms);
            let changed = (state.progress - progress).abs() > f32::EPSILON;
            state.progress = progress;
            changed
        });
    }
}

async fn run_event_loop(shared: Arc<Shared>, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => shared.handle_event(&event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Dropped {} session events, resynchronizing", skipped);
                shared.handle_event(&SessionEvent::Events);
            }
            Err(RecvError::Closed) => {
                debug!("Session event stream closed");
                break;
            }
        }
    }
}

async fn run_progress_loop(shared: Arc<Shared>) {
    let mut ticker = interval(shared.config.progress_poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        shared.poll_progress();
    }
}

/// Playback controller shared by every screen.
///
/// Construct once per application and hand out clones of the `Arc`.
pub struct PlayerStore {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlayerStore {
    /// Creates the store and starts its background tasks.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(session: Arc<dyn MediaSession>, config: PlayerConfig) -> Arc<Self> {
        let shared = Arc::new(Shared {
            session,
            state: Sender::new(PlayerState::default()),
            config,
        });

        // Subscribed here so commands issued right after `new` are observed.
        let receiver = shared.session.subscribe();
        let events = spawn(run_event_loop(Arc::clone(&shared), receiver));
        let progress = spawn(run_progress_loop(Arc::clone(&shared)));

        Arc::new(Self {
            shared,
            tasks: Mutex::new(vec![events, progress]),
        })
    }

    /// Current snapshot of the playback state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.shared.state.borrow().clone()
    }

    /// Subscribes to playback state changes.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<PlayerState> {
        self.shared.state.subscribe()
    }

    /// Starts `tracks` at `start_index`.
    ///
    /// Repeating the current playlist and index toggles play/pause instead.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::IndexOutOfRange` if `start_index` is not a valid
    /// index into `tracks`; the state is left untouched.
    pub fn set_playlist(&self, tracks: Vec<Track>, start_index: usize) -> Result<(), PlayerError> {
        if start_index >= tracks.len() {
            return Err(PlayerError::IndexOutOfRange {
                index: start_index,
                len: tracks.len(),
            });
        }

        let is_same = {
            let state = self.shared.state.borrow();
            state.current_index == Some(start_index) && state.tracks == tracks
        };
        if is_same {
            debug!("Playlist unchanged, toggling playback");
            self.toggle_playback();
            return Ok(());
        }

        debug!(
            "New playlist of {} tracks starting at {}",
            tracks.len(),
            start_index
        );
        let items = tracks.iter().map(MediaItem::from).collect();
        self.shared.state.send_modify(|state| {
            state.tracks = tracks;
            state.current_index = Some(start_index);
            state.progress = 0.0;
            state.duration_ms = 0;
        });

        let session = &self.shared.session;
        session.set_media_items(items, start_index);
        session.prepare();
        session.play();
        Ok(())
    }

    /// Moves to the following track; no-op on the last one.
    pub fn next_track(&self) {
        let target = {
            let state = self.shared.state.borrow();
            state
                .current_index
                .filter(|_| state.has_next())
                .map(|index| index + 1)
        };
        if let Some(index) = target {
            self.jump_to(index);
        }
    }

    /// Moves to the preceding track; no-op on the first one.
    pub fn prev_track(&self) {
        let target = {
            let state = self.shared.state.borrow();
            state
                .current_index
                .filter(|_| state.has_previous())
                .map(|index| index - 1)
        };
        if let Some(index) = target {
            self.jump_to(index);
        }
    }

    fn jump_to(&self, index: usize) {
        debug!("Jumping to track {}", index);
        self.shared.state.send_modify(|state| {
            state.current_index = Some(index);
            state.progress = 0.0;
        });
        self.shared.session.seek_to_item(index, 0);
        self.shared.session.play();
    }

    /// Resumes playback. `is_playing` follows once the session confirms.
    pub fn play(&self) {
        self.shared.session.play();
    }

    /// Pauses playback. `is_playing` follows once the session confirms.
    pub fn pause(&self) {
        self.shared.session.pause();
    }

    /// Pauses when playing, plays otherwise.
    pub fn toggle_playback(&self) {
        if self.shared.state.borrow().is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seeks within the current track and ends any slider drag.
    pub fn seek_to(&self, position_ms: u64) {
        self.shared.state.send_modify(|state| {
            state.is_slider_moving = false;
            state.progress = progress_fraction(position_ms, state.duration_ms);
        });
        self.shared.session.seek_to(position_ms);
    }

    /// Marks whether the user is dragging the seek control.
    pub fn update_slider_moving(&self, is_moving: bool) {
        self.shared.state.send_if_modified(|state| {
            let changed = state.is_slider_moving != is_moving;
            state.is_slider_moving = is_moving;
            changed
        });
    }
}

impl Drop for PlayerStore {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}
