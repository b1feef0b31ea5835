//! Authoritative playback state.

use crate::library::Track;

/// Playback state owned by the `PlayerStore`.
///
/// `current_index` is either `None` or a valid index into `tracks`.
/// `progress` is a fraction in `[0, 1]` and only meaningful when
/// `duration_ms > 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    /// The active playlist.
    pub tracks: Vec<Track>,
    /// Position of the current track in `tracks`.
    pub current_index: Option<usize>,
    /// Whether the session is audibly playing.
    pub is_playing: bool,
    /// Elapsed fraction of the current track.
    pub progress: f32,
    /// Duration of the current track in milliseconds, 0 when unknown.
    pub duration_ms: u64,
    /// Set while the user drags the seek control; suspends progress polling.
    pub is_slider_moving: bool,
}

impl PlayerState {
    /// The track at `current_index`, if any.
    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|index| self.tracks.get(index))
    }

    /// Whether `next_track` would move.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_index
            .is_some_and(|index| index + 1 < self.tracks.len())
    }

    /// Whether `prev_track` would move.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current_index.is_some_and(|index| index > 0)
    }

    /// Maps a session-reported index onto this playlist.
    pub(crate) fn checked_index(&self, index: Option<usize>) -> Option<usize> {
        index.filter(|&i| i < self.tracks.len())
    }
}

/// Normalized progress of `position_ms` within `duration_ms`.
///
/// An unknown duration (0) is treated as 1 ms.
#[must_use]
pub fn progress_fraction(position_ms: u64, duration_ms: u64) -> f32 {
    let duration = duration_ms.max(1) as f64;
    (position_ms as f64 / duration).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use crate::{
        library::Track,
        player::state::{PlayerState, progress_fraction},
    };

    fn state_with(count: usize, current_index: Option<usize>) -> PlayerState {
        PlayerState {
            tracks: (0..count)
                .map(|i| Track {
                    id: i64::try_from(i).unwrap(),
                    ..Track::default()
                })
                .collect(),
            current_index,
            ..PlayerState::default()
        }
    }

    #[test]
    fn test_default_state_has_no_current_track() {
        let state = PlayerState::default();
        assert!(state.current_track().is_none());
        assert!(!state.has_next());
        assert!(!state.has_previous());
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn test_navigation_bounds() {
        let first = state_with(3, Some(0));
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = state_with(3, Some(2));
        assert!(!last.has_next());
        assert!(last.has_previous());
        assert_eq!(last.current_track().map(|t| t.id), Some(2));
    }

    #[test]
    fn test_checked_index() {
        let state = state_with(2, None);
        assert_eq!(state.checked_index(Some(1)), Some(1));
        assert_eq!(state.checked_index(Some(2)), None);
        assert_eq!(state.checked_index(None), None);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(5_000, 10_000), 0.5);
        assert_eq!(progress_fraction(0, 10_000), 0.0);
        assert_eq!(progress_fraction(20_000, 10_000), 1.0);
        // Unknown duration must not divide by zero.
        assert_eq!(progress_fraction(0, 0), 0.0);
        assert_eq!(progress_fraction(500, 0), 1.0);
    }
}
