//! Projection of the player state for the "now playing" screen.
//!
//! The adapter mirrors [`PlayerState`] into [`PlaybackViewState`], except
//! that while the user drags the seek control the locally dragged progress
//! wins over the progress reported by the store.

use std::sync::Arc;

use tokio::{
    spawn,
    sync::watch::{Receiver, Sender},
    task::JoinHandle,
};

use crate::{
    library::Track,
    player::{PlayerState, PlayerStore, progress_fraction},
};

/// What the player screen renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackViewState {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub is_playing: bool,
    /// Displayed fraction of the current track.
    pub progress: f32,
    pub duration_ms: u64,
    /// Local drag flag of the seek control.
    pub is_slider_moving: bool,
}

impl PlaybackViewState {
    /// Applies a store snapshot, keeping the dragged progress while sliding.
    fn project(&mut self, player: &PlayerState) -> bool {
        let projected = Self {
            tracks: player.tracks.clone(),
            current_index: player.current_index,
            current_track: player.current_track().cloned(),
            is_playing: player.is_playing,
            progress: if self.is_slider_moving {
                self.progress
            } else {
                player.progress
            },
            duration_ms: player.duration_ms,
            is_slider_moving: self.is_slider_moving,
        };
        let changed = *self != projected;
        *self = projected;
        changed
    }
}

async fn observe_player(state: Arc<Sender<PlaybackViewState>>, mut player: Receiver<PlayerState>) {
    while player.changed().await.is_ok() {
        let snapshot = player.borrow_and_update().clone();
        state.send_if_modified(|view| view.project(&snapshot));
    }
}

/// Adapter between the player screen and the `PlayerStore`.
pub struct PlaybackViewAdapter {
    player: Arc<PlayerStore>,
    state: Arc<Sender<PlaybackViewState>>,
    observer: JoinHandle<()>,
}

impl PlaybackViewAdapter {
    /// Creates the adapter from the store's current state.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(player: Arc<PlayerStore>) -> Self {
        let updates = player.subscribe();
        let mut initial = PlaybackViewState::default();
        initial.project(&updates.borrow());

        let state = Arc::new(Sender::new(initial));
        let observer = spawn(observe_player(Arc::clone(&state), updates));

        Self {
            player,
            state,
            observer,
        }
    }

    /// Current view state.
    #[must_use]
    pub fn state(&self) -> PlaybackViewState {
        self.state.borrow().clone()
    }

    /// Subscribes to view state changes.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<PlaybackViewState> {
        self.state.subscribe()
    }

    pub fn play(&self) {
        self.player.play();
    }

    pub fn pause(&self) {
        self.player.pause();
    }

    pub fn next_track(&self) {
        self.player.next_track();
    }

    pub fn prev_track(&self) {
        self.player.prev_track();
    }

    /// Starts or ends a drag of the seek control.
    pub fn update_slider_moving(&self, is_moving: bool) {
        self.state.send_if_modified(|view| {
            let changed = view.is_slider_moving != is_moving;
            view.is_slider_moving = is_moving;
            changed
        });
        self.player.update_slider_moving(is_moving);
    }

    /// Records the dragged position as a fraction of the track.
    pub fn update_slider_position(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.state.send_if_modified(|view| {
            let changed = (view.progress - fraction).abs() > f32::EPSILON;
            view.progress = fraction;
            changed
        });
    }

    /// Ends a drag by seeking to the dragged position.
    pub fn release_slider(&self) {
        let position_ms = {
            let view = self.state.borrow();
            fraction_to_position(view.progress, view.duration_ms)
        };
        self.seek_to(position_ms);
    }

    /// Seeks to `position_ms`, showing the new progress right away.
    pub fn seek_to(&self, position_ms: u64) {
        self.state.send_modify(|view| {
            view.is_slider_moving = false;
            view.progress = progress_fraction(position_ms, view.duration_ms);
        });
        self.player.seek_to(position_ms);
    }
}

/// Position in milliseconds of `fraction` within `duration_ms`.
fn fraction_to_position(fraction: f32, duration_ms: u64) -> u64 {
    let position = f64::from(fraction.clamp(0.0, 1.0)) * duration_ms as f64;
    position.round() as u64
}

impl Drop for PlaybackViewAdapter {
    fn drop(&mut self) {
        self.observer.abort();
    }
}
