//! Media session abstraction and a clock-driven simulated backend.
//!
//! The media session owns the actual audio playback. Commands are accepted
//! synchronously; the resulting state changes are announced through
//! [`SessionEvent`]s which the `PlayerStore` mirrors.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use {
    parking_lot::Mutex,
    tokio::{
        runtime::Handle,
        sync::broadcast::{Receiver, Sender, channel},
        time::{Instant, MissedTickBehavior, interval},
    },
    tracing::debug,
};

use crate::library::Track;

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How often the simulated playhead is checked for the end of an item.
const END_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of the session's player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Nothing prepared.
    #[default]
    Idle,
    /// Preparing or waiting for data.
    Buffering,
    /// Able to play immediately.
    Ready,
    /// Reached the end of the queue.
    Ended,
}

/// Callbacks emitted by a media session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The player's lifecycle status changed.
    PlaybackStateChanged(PlaybackStatus),
    /// The session moved to another queue item.
    MediaItemTransition { index: Option<usize> },
    /// Generic notification that one or more properties changed.
    Events,
}

/// An entry of the session's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Identifier of the originating track.
    pub media_id: String,
    /// Playable resource locator.
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub artwork_uri: Option<String>,
}

impl From<&Track> for MediaItem {
    fn from(track: &Track) -> Self {
        Self {
            media_id: track.id.to_string(),
            uri: track.media_uri.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_uri: track.album_cover_uri.clone(),
        }
    }
}

/// A platform-managed media session.
pub trait MediaSession: Send + Sync {
    /// Replaces the queue and selects `start_index` at position 0.
    fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize);
    /// Prepares the queue for playback.
    fn prepare(&self);
    fn play(&self);
    fn pause(&self);
    /// Seeks within the current item.
    fn seek_to(&self, position_ms: u64);
    /// Switches to queue item `index` at `position_ms`.
    fn seek_to_item(&self, index: usize, position_ms: u64);
    fn current_item_index(&self) -> Option<usize>;
    fn current_position_ms(&self) -> u64;
    /// Duration of the current item, `None` while unknown.
    fn duration_ms(&self) -> Option<u64>;
    fn is_playing(&self) -> bool;
    fn play_when_ready(&self) -> bool;
    fn playback_status(&self) -> PlaybackStatus;
    /// Subscribes to session callbacks.
    fn subscribe(&self) -> Receiver<SessionEvent>;
}

#[derive(Debug)]
struct SimulatedPlayer {
    items: Vec<MediaItem>,
    index: Option<usize>,
    status: PlaybackStatus,
    play_when_ready: bool,
    /// Position at `anchor`.
    position_ms: u64,
    anchor: Instant,
    /// When the current item was switched to.
    loaded_at: Instant,
}

impl SimulatedPlayer {
    fn duration_ms(&self, track_duration: Duration, load_delay: Duration) -> Option<u64> {
        self.index?;
        if self.loaded_at.elapsed() < load_delay {
            return None;
        }
        u64::try_from(track_duration.as_millis()).ok()
    }

    fn is_running(&self) -> bool {
        self.status == PlaybackStatus::Ready && self.play_when_ready && self.index.is_some()
    }

    /// Playhead position, not clamped to the item length.
    fn raw_position_ms(&self) -> u64 {
        if self.is_running() {
            let elapsed = u64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(u64::MAX);
            self.position_ms.saturating_add(elapsed)
        } else {
            self.position_ms
        }
    }

    fn position_ms(&self, track_duration: Duration) -> u64 {
        self.raw_position_ms().min(millis(track_duration))
    }

    /// Moves past every item the playhead has run off, ending on the last one.
    fn advance_finished_items(&mut self, track_duration: Duration) -> Vec<SessionEvent> {
        let limit = millis(track_duration);
        let mut events = Vec::new();
        while self.is_running() {
            let raw = self.raw_position_ms();
            let Some(index) = self.index.filter(|_| raw >= limit) else {
                break;
            };
            let now = Instant::now();
            if index + 1 < self.items.len() {
                let overshoot = Duration::from_millis(raw - limit);
                self.index = Some(index + 1);
                self.position_ms = 0;
                self.anchor = now.checked_sub(overshoot).unwrap_or(now);
                self.loaded_at = self.anchor;
                events.push(SessionEvent::MediaItemTransition {
                    index: self.index,
                });
            } else {
                self.status = PlaybackStatus::Ended;
                self.position_ms = limit;
                self.anchor = now;
                events.push(SessionEvent::PlaybackStateChanged(PlaybackStatus::Ended));
            }
        }
        if !events.is_empty() {
            events.push(SessionEvent::Events);
        }
        events
    }

    /// A seek out of the ended state makes the player ready again.
    fn restart_if_ended(&mut self) -> Option<SessionEvent> {
        (self.status == PlaybackStatus::Ended).then(|| {
            self.status = PlaybackStatus::Ready;
            SessionEvent::PlaybackStateChanged(PlaybackStatus::Ready)
        })
    }

    /// Pins the running position so a status change does not lose it.
    fn freeze(&mut self, track_duration: Duration) {
        self.position_ms = self.position_ms(track_duration);
        self.anchor = Instant::now();
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Headless media session advancing a virtual playhead on the tokio clock.
///
/// Every item lasts `track_duration`. After each item switch the duration is
/// reported as unknown for `load_delay`, like a real player that is still
/// reading the stream header. When an item finishes the session moves to the next
/// one; after the last item it reports `PlaybackStatus::Ended`.
#[derive(Debug)]
pub struct SimulatedSession {
    player: Mutex<SimulatedPlayer>,
    track_duration: Duration,
    load_delay: Duration,
    events: Sender<SessionEvent>,
}

impl SimulatedSession {
    /// Creates a session whose items all last `track_duration`.
    #[must_use]
    pub fn new(track_duration: Duration) -> Arc<Self> {
        Self::with_load_delay(track_duration, Duration::ZERO)
    }

    /// Creates a session that reports unknown durations for `load_delay` after each switch.
    ///
    /// Inside a tokio runtime a background task watches for finished items;
    /// otherwise they are detected on the next read.
    #[must_use]
    pub fn with_load_delay(track_duration: Duration, load_delay: Duration) -> Arc<Self> {
        let (events, _) = channel(EVENT_CHANNEL_CAPACITY);
        let now = Instant::now();
        let session = Arc::new(Self {
            player: Mutex::new(SimulatedPlayer {
                items: Vec::new(),
                index: None,
                status: PlaybackStatus::Idle,
                play_when_ready: false,
                position_ms: 0,
                anchor: now,
                loaded_at: now,
            }),
            track_duration,
            load_delay,
            events,
        });

        if let Ok(runtime) = Handle::try_current() {
            runtime.spawn(watch_item_end(Arc::downgrade(&session)));
        }
        session
    }

    /// Items currently queued.
    #[must_use]
    pub fn media_items(&self) -> Vec<MediaItem> {
        self.player.lock().items.clone()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the store may not be attached yet.
        let _ = self.events.send(event);
    }

    /// Applies item ends the playhead has reached since the last check.
    fn settle(&self) {
        let events = self
            .player
            .lock()
            .advance_finished_items(self.track_duration);
        for event in events {
            debug!("SimulatedSession: {:?}", event);
            self.emit(event);
        }
    }
}

async fn watch_item_end(session: Weak<SimulatedSession>) {
    let mut ticker = interval(END_CHECK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(session) = session.upgrade() else {
            break;
        };
        session.settle();
    }
}

impl MediaSession for SimulatedSession {
    fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize) {
        let index = {
            let mut player = self.player.lock();
            player.index = if items.is_empty() {
                None
            } else {
                Some(start_index.min(items.len() - 1))
            };
            player.items = items;
            player.status = PlaybackStatus::Idle;
            player.position_ms = 0;
            player.anchor = Instant::now();
            player.loaded_at = player.anchor;
            player.index
        };
        debug!("SimulatedSession: queue replaced, index {:?}", index);
        self.emit(SessionEvent::MediaItemTransition { index });
    }

    fn prepare(&self) {
        let status = {
            let mut player = self.player.lock();
            player.status = if player.items.is_empty() {
                PlaybackStatus::Idle
            } else {
                PlaybackStatus::Ready
            };
            player.anchor = Instant::now();
            player.status
        };
        self.emit(SessionEvent::PlaybackStateChanged(status));
    }

    fn play(&self) {
        {
            let mut player = self.player.lock();
            player.freeze(self.track_duration);
            player.play_when_ready = true;
        }
        self.emit(SessionEvent::Events);
    }

    fn pause(&self) {
        {
            let mut player = self.player.lock();
            player.freeze(self.track_duration);
            player.play_when_ready = false;
        }
        self.emit(SessionEvent::Events);
    }

    fn seek_to(&self, position_ms: u64) {
        let restarted = {
            let mut player = self.player.lock();
            player.position_ms = position_ms.min(millis(self.track_duration));
            player.anchor = Instant::now();
            player.restart_if_ended()
        };
        if let Some(event) = restarted {
            self.emit(event);
        }
        self.emit(SessionEvent::Events);
    }

    fn seek_to_item(&self, index: usize, position_ms: u64) {
        let (changed, restarted) = {
            let mut player = self.player.lock();
            if index >= player.items.len() {
                return;
            }
            let changed = player.index != Some(index);
            player.index = Some(index);
            player.position_ms = position_ms;
            player.anchor = Instant::now();
            if changed {
                player.loaded_at = player.anchor;
            }
            (changed, player.restart_if_ended())
        };
        if changed {
            self.emit(SessionEvent::MediaItemTransition { index: Some(index) });
        }
        if let Some(event) = restarted {
            self.emit(event);
        }
        self.emit(SessionEvent::Events);
    }

    fn current_item_index(&self) -> Option<usize> {
        self.settle();
        self.player.lock().index
    }

    fn current_position_ms(&self) -> u64 {
        self.settle();
        self.player.lock().position_ms(self.track_duration)
    }

    fn duration_ms(&self) -> Option<u64> {
        self.settle();
        self.player
            .lock()
            .duration_ms(self.track_duration, self.load_delay)
    }

    fn is_playing(&self) -> bool {
        self.settle();
        let player = self.player.lock();
        player.is_running() && player.position_ms(self.track_duration) < millis(self.track_duration)
    }

    fn play_when_ready(&self) -> bool {
        self.player.lock().play_when_ready
    }

    fn playback_status(&self) -> PlaybackStatus {
        self.settle();
        self.player.lock().status
    }

    fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{advance, sleep};

    use crate::{
        library::Track,
        player::session::{MediaItem, MediaSession, PlaybackStatus, SessionEvent, SimulatedSession},
    };

    fn items(count: usize) -> Vec<MediaItem> {
        (0..count)
            .map(|i| {
                MediaItem::from(&Track {
                    id: i64::try_from(i).unwrap(),
                    media_uri: format!("/music/{i}.mp3"),
                    ..Track::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_media_item_from_track() {
        let item = MediaItem::from(&Track {
            id: 7,
            title: "Song".to_string(),
            artist: "Band".to_string(),
            media_uri: "https://cdn/7.mp3".to_string(),
            album_title: "Album".to_string(),
            album_cover_uri: Some("cover".to_string()),
        });
        assert_eq!(item.media_id, "7");
        assert_eq!(item.uri, "https://cdn/7.mp3");
        assert_eq!(item.artwork_uri.as_deref(), Some("cover"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playhead_advances_only_while_playing() {
        let session = SimulatedSession::new(Duration::from_secs(10));
        session.set_media_items(items(1), 0);
        session.prepare();
        session.play();
        assert!(session.is_playing());

        advance(Duration::from_secs(3)).await;
        assert_eq!(session.current_position_ms(), 3_000);

        session.pause();
        advance(Duration::from_secs(3)).await;
        assert_eq!(session.current_position_ms(), 3_000);
        assert!(!session.is_playing());

        session.play();
        advance(Duration::from_secs(30)).await;
        assert_eq!(session.current_position_ms(), 10_000);
        assert!(!session.is_playing());
        assert_eq!(session.playback_status(), PlaybackStatus::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_item_moves_to_next_then_ends() {
        let session = SimulatedSession::new(Duration::from_secs(1));
        let mut events = session.subscribe();
        session.set_media_items(items(2), 0);
        session.prepare();
        session.play();

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(session.current_item_index(), Some(1));
        assert!(session.is_playing());
        let position = session.current_position_ms();
        assert!((400..=600).contains(&position), "position {position}");

        sleep(Duration::from_secs(1)).await;
        assert_eq!(session.current_item_index(), Some(1));
        assert_eq!(session.playback_status(), PlaybackStatus::Ended);
        assert!(!session.is_playing());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&SessionEvent::MediaItemTransition { index: Some(1) }));
        assert!(seen.contains(&SessionEvent::PlaybackStateChanged(PlaybackStatus::Ended)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_after_end_resumes() {
        let session = SimulatedSession::new(Duration::from_secs(1));
        session.set_media_items(items(1), 0);
        session.prepare();
        session.play();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(session.playback_status(), PlaybackStatus::Ended);

        session.seek_to(0);
        assert_eq!(session.playback_status(), PlaybackStatus::Ready);
        assert!(session.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_unknown_during_load_delay() {
        let session =
            SimulatedSession::with_load_delay(Duration::from_secs(10), Duration::from_millis(100));
        assert_eq!(session.duration_ms(), None);

        session.set_media_items(items(1), 0);
        assert_eq!(session.duration_ms(), None);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(session.duration_ms(), Some(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_emitted() {
        let session = SimulatedSession::new(Duration::from_secs(10));
        let mut events = session.subscribe();

        session.set_media_items(items(3), 0);
        session.prepare();
        session.seek_to_item(2, 0);

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::MediaItemTransition { index: Some(0) }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::PlaybackStateChanged(PlaybackStatus::Ready)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::MediaItemTransition { index: Some(2) }
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Events);
        assert_eq!(session.current_item_index(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_starts_at_requested_item() {
        let session = SimulatedSession::new(Duration::from_secs(10));
        let mut events = session.subscribe();

        session.set_media_items(items(3), 2);
        assert_eq!(session.current_item_index(), Some(2));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::MediaItemTransition { index: Some(2) }
        );

        session.set_media_items(items(2), 9);
        assert_eq!(session.current_item_index(), Some(1));
        session.set_media_items(Vec::new(), 0);
        assert_eq!(session.current_item_index(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_item_is_ignored() {
        let session = SimulatedSession::new(Duration::from_secs(10));
        session.set_media_items(items(1), 0);
        session.seek_to_item(5, 0);
        assert_eq!(session.current_item_index(), Some(0));
        assert_eq!(session.media_items().len(), 1);
    }
}
