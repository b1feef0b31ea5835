//! Playback control.
//!
//! A [`PlayerStore`] drives a [`MediaSession`] and publishes the resulting
//! [`PlayerState`] to every interested view.

pub mod session;
pub mod state;
pub mod store;
mod store_tests;

pub use {
    session::{MediaItem, MediaSession, PlaybackStatus, SessionEvent, SimulatedSession},
    state::{PlayerState, progress_fraction},
    store::{PlayerConfig, PlayerStore},
};
