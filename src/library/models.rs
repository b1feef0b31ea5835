//! Data models shared by repositories, the player and the view models.

use {
    serde::{Deserialize, Serialize},
    sqlx::FromRow,
};

/// A playable audio item.
///
/// Tracks are immutable values; equality covers every field, which is how the
/// player recognises a re-tap on the playlist that is already loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier assigned by the source.
    pub id: i64,
    /// Track title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Playable resource locator: a local file path or a streaming URL.
    pub media_uri: String,
    /// Album title.
    pub album_title: String,
    /// Album artwork locator, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_cover_uri: Option<String>,
}

/// A row of the on-device media index.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MediaRow {
    /// Unique database ID.
    pub id: i64,
    /// Track title.
    pub title: String,
    /// Track artist.
    pub artist: String,
    /// File system path to the audio file.
    pub path: String,
    /// ID of the album, used to locate cover art.
    pub album_id: i64,
    /// Album title.
    pub album: String,
}

/// A file to be written into the media index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaEntry {
    /// Track title.
    pub title: String,
    /// Track artist.
    pub artist: String,
    /// File system path to the audio file.
    pub path: String,
    /// Album title.
    pub album: String,
    /// Whether the file counts as music (as opposed to ringtones, alarms, ...).
    pub is_music: bool,
    /// Unix timestamp used for "recently added" ordering.
    pub date_added: i64,
}
