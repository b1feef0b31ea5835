//! Integration tests for the player store.
//!
//! These tests drive `PlayerStore` against the simulated session and a
//! scripted stub, with the tokio clock paused.

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use {
        parking_lot::Mutex,
        tokio::{
            sync::broadcast::{Receiver, Sender, channel},
            time::sleep,
        },
    };

    use crate::{
        error::PlayerError,
        library::Track,
        player::{
            session::{MediaItem, MediaSession, PlaybackStatus, SessionEvent, SimulatedSession},
            store::{PlayerConfig, PlayerStore},
        },
    };

    const TRACK_LENGTH: Duration = Duration::from_secs(10);

    fn create_test_tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|i| Track {
                id: i64::try_from(i).unwrap(),
                title: format!("Track {i}"),
                artist: "Artist".to_string(),
                media_uri: format!("/music/track_{i}.mp3"),
                album_title: "Album".to_string(),
                album_cover_uri: None,
            })
            .collect()
    }

    /// Lets the store's tasks drain pending session events.
    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    /// Session whose reads are scripted by the test.
    struct StubSession {
        commands: Mutex<Vec<String>>,
        index: Mutex<Option<usize>>,
        /// Successive duration reads; the last entry repeats.
        durations: Mutex<VecDeque<Option<u64>>>,
        events: Sender<SessionEvent>,
    }

    impl StubSession {
        fn new(durations: &[Option<u64>]) -> Arc<Self> {
            let (events, _) = channel(16);
            Arc::new(Self {
                commands: Mutex::new(Vec::new()),
                index: Mutex::new(None),
                durations: Mutex::new(durations.iter().copied().collect()),
                events,
            })
        }

        fn emit(&self, event: SessionEvent) {
            self.events.send(event).unwrap();
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().clone()
        }

        fn record(&self, command: impl Into<String>) {
            self.commands.lock().push(command.into());
        }
    }

    impl MediaSession for StubSession {
        fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize) {
            *self.index.lock() = (start_index < items.len()).then_some(start_index);
            self.record(format!("set_media_items({}, {start_index})", items.len()));
        }

        fn prepare(&self) {
            self.record("prepare");
        }

        fn play(&self) {
            self.record("play");
        }

        fn pause(&self) {
            self.record("pause");
        }

        fn seek_to(&self, position_ms: u64) {
            self.record(format!("seek_to({position_ms})"));
        }

        fn seek_to_item(&self, index: usize, position_ms: u64) {
            *self.index.lock() = Some(index);
            self.record(format!("seek_to_item({index}, {position_ms})"));
        }

        fn current_item_index(&self) -> Option<usize> {
            *self.index.lock()
        }

        fn current_position_ms(&self) -> u64 {
            0
        }

        fn duration_ms(&self) -> Option<u64> {
            let mut durations = self.durations.lock();
            if durations.len() > 1 {
                durations.pop_front().flatten()
            } else {
                durations.front().copied().flatten()
            }
        }

        fn is_playing(&self) -> bool {
            false
        }

        fn play_when_ready(&self) -> bool {
            false
        }

        fn playback_status(&self) -> PlaybackStatus {
            PlaybackStatus::Idle
        }

        fn subscribe(&self) -> Receiver<SessionEvent> {
            self.events.subscribe()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_playlist_starts_playback() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        store.set_playlist(create_test_tracks(3), 1).unwrap();
        settle().await;

        let state = store.state();
        assert_eq!(state.tracks.len(), 3);
        assert_eq!(state.current_index, Some(1));
        assert!(state.is_playing);
        assert_eq!(state.duration_ms, 10_000);
        assert_eq!(session.media_items().len(), 3);
        assert_eq!(session.current_item_index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_playlist_toggles_playback() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());
        let tracks = create_test_tracks(3);

        store.set_playlist(tracks.clone(), 1).unwrap();
        settle().await;
        assert!(store.state().is_playing);

        store.set_playlist(tracks.clone(), 1).unwrap();
        settle().await;
        assert!(!store.state().is_playing);
        assert_eq!(store.state().current_index, Some(1));

        store.set_playlist(tracks, 1).unwrap();
        settle().await;
        assert!(store.state().is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_start_index_is_rejected() {
        let session = StubSession::new(&[Some(1_000)]);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        assert_eq!(
            store.set_playlist(create_test_tracks(3), 3),
            Err(PlayerError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            store.set_playlist(Vec::new(), 0),
            Err(PlayerError::IndexOutOfRange { index: 0, len: 0 })
        );

        assert!(store.state().tracks.is_empty());
        assert!(session.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_and_prev_stay_in_bounds() {
        let session = StubSession::new(&[Some(1_000)]);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        store.set_playlist(create_test_tracks(2), 0).unwrap();
        store.prev_track();
        assert_eq!(store.state().current_index, Some(0));

        store.next_track();
        assert_eq!(store.state().current_index, Some(1));
        store.next_track();
        assert_eq!(store.state().current_index, Some(1));

        store.prev_track();
        assert_eq!(store.state().current_index, Some(0));

        assert_eq!(
            session.commands(),
            [
                "set_media_items(2, 0)",
                "prepare",
                "play",
                "seek_to_item(1, 0)",
                "play",
                "seek_to_item(0, 0)",
                "play",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_sets_progress_immediately() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        store.set_playlist(create_test_tracks(1), 0).unwrap();
        settle().await;
        store.pause();
        settle().await;

        store.update_slider_moving(true);
        store.seek_to(5_000);

        let state = store.state();
        assert!((state.progress - 0.5).abs() < f32::EPSILON);
        assert!(!state.is_slider_moving);
        assert_eq!(session.current_position_ms(), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_is_suppressed_while_dragging() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session, PlayerConfig::default());

        store.set_playlist(create_test_tracks(1), 0).unwrap();
        sleep(Duration::from_secs(2)).await;
        let before_drag = store.state().progress;
        assert!(before_drag > 0.1 && before_drag < 0.3, "{before_drag}");

        store.update_slider_moving(true);
        sleep(Duration::from_secs(3)).await;
        assert_eq!(store.state().progress, before_drag);

        store.update_slider_moving(false);
        sleep(Duration::from_secs(1)).await;
        assert!(store.state().progress > 0.4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_clamped_at_the_end() {
        let session = SimulatedSession::new(Duration::from_secs(1));
        let store = PlayerStore::new(session, PlayerConfig::default());

        store.set_playlist(create_test_tracks(1), 0).unwrap();
        sleep(Duration::from_millis(900)).await;
        assert!(store.state().progress <= 1.0);
        sleep(Duration::from_secs(5)).await;
        assert!(store.state().progress <= 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playlist_advances_and_stops_after_last_track() {
        let session = SimulatedSession::new(Duration::from_secs(1));
        let store = PlayerStore::new(session, PlayerConfig::default());

        store.set_playlist(create_test_tracks(2), 0).unwrap();
        sleep(Duration::from_millis(1_500)).await;
        let state = store.state();
        assert_eq!(state.current_index, Some(1));
        assert!(state.is_playing);

        sleep(Duration::from_secs(1)).await;
        let state = store.state();
        assert_eq!(state.current_index, Some(1));
        assert!(!state.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_index_is_the_only_transition() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());
        let mut events = session.subscribe();

        store.set_playlist(create_test_tracks(3), 2).unwrap();
        settle().await;

        let mut transitions = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::MediaItemTransition { index } = event {
                transitions.push(index);
            }
        }
        assert_eq!(transitions, [Some(2)]);
        assert_eq!(store.state().current_index, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_stays_empty_while_duration_unknown() {
        let session = SimulatedSession::with_load_delay(TRACK_LENGTH, Duration::from_secs(5));
        let store = PlayerStore::new(session, PlayerConfig::default());

        store.set_playlist(create_test_tracks(1), 0).unwrap();
        sleep(Duration::from_millis(500)).await;
        let state = store.state();
        assert!(state.is_playing);
        assert_eq!(state.duration_ms, 0);
        assert_eq!(state.progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_is_read_again_after_delay() {
        let session = StubSession::new(&[None, Some(7_000)]);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        session.emit(SessionEvent::MediaItemTransition { index: None });
        settle().await;
        assert_eq!(store.state().duration_ms, 0);

        sleep(Duration::from_millis(250)).await;
        assert_eq!(store.state().duration_ms, 7_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_duration_falls_back_to_zero() {
        let session = SimulatedSession::with_load_delay(TRACK_LENGTH, Duration::from_secs(5));
        let store = PlayerStore::new(session, PlayerConfig::default());

        store.set_playlist(create_test_tracks(1), 0).unwrap();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(store.state().duration_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_index_outside_playlist_maps_to_none() {
        let session = StubSession::new(&[Some(1_000)]);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());

        store.set_playlist(create_test_tracks(2), 1).unwrap();
        settle().await;
        assert_eq!(store.state().current_index, Some(1));

        *session.index.lock() = Some(9);
        session.emit(SessionEvent::MediaItemTransition { index: Some(9) });
        settle().await;

        let state = store.state();
        assert_eq!(state.current_index, None);
        assert!(state.current_track().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_changes() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session, PlayerConfig::default());
        let mut updates = store.subscribe();

        store.set_playlist(create_test_tracks(2), 0).unwrap();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().current_index, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_background_tasks() {
        let session = SimulatedSession::new(TRACK_LENGTH);
        let store = PlayerStore::new(session.clone(), PlayerConfig::default());
        store.set_playlist(create_test_tracks(1), 0).unwrap();
        settle().await;

        drop(store);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(Arc::strong_count(&session), 1);
    }
}
