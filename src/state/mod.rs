//! Observable view state for the listing and player screens.
//!
//! View models subscribe to the shared `PlayerStore` and publish their own
//! state over `watch` channels.

pub mod app_context;
pub mod list_view;
pub mod playback_view;

pub use {
    app_context::AppContext,
    list_view::{ListViewState, TrackListViewModel},
    playback_view::{PlaybackViewAdapter, PlaybackViewState},
};
