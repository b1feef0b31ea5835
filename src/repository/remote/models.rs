//! Wire models of the remote catalogue.
//!
//! Unknown JSON fields are ignored.

use serde::Deserialize;

use crate::library::Track;

/// A track as returned by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiTrack {
    pub id: i64,
    pub title: String,
    /// Streaming URL of the track preview.
    pub preview: String,
    pub artist: ApiArtist,
    pub album: ApiAlbum,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiAlbum {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover_big: Option<String>,
}

/// One page of tracks plus the URL of the next page, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TracksData {
    #[serde(default)]
    pub data: Vec<ApiTrack>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Body of `GET chart`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    pub tracks: TracksData,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        Self {
            id: track.id,
            title: track.title,
            artist: track.artist.name,
            media_uri: track.preview,
            album_title: track.album.title,
            album_cover_uri: track.album.cover_big,
        }
    }
}

impl TracksData {
    /// Converts the page into domain tracks, keeping the continuation URL.
    #[must_use]
    pub fn into_tracks(self) -> (Vec<Track>, Option<String>) {
        let tracks = self.data.into_iter().map(Track::from).collect();
        (tracks, self.next)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::from_str;

    use crate::{
        library::Track,
        repository::remote::models::{ApiTrack, ChartResponse, TracksData},
    };

    #[test]
    fn test_api_track_maps_every_field() {
        let api_track: ApiTrack = from_str(
            r#"{
                "id": 1,
                "title": "A",
                "preview": "u",
                "artist": {"name": "B", "id": 77},
                "album": {"cover_big": "c", "title": "T", "cover_small": "s"},
                "rank": 900
            }"#,
        )
        .unwrap();

        assert_eq!(
            Track::from(api_track),
            Track {
                id: 1,
                title: "A".to_string(),
                artist: "B".to_string(),
                media_uri: "u".to_string(),
                album_title: "T".to_string(),
                album_cover_uri: Some("c".to_string()),
            }
        );
    }

    #[test]
    fn test_tracks_data_defaults() {
        let page: TracksData = from_str(r#"{"total": 0}"#).unwrap();
        assert!(page.data.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_chart_response_unwraps_tracks() {
        let chart: ChartResponse = from_str(
            r#"{
                "tracks": {"data": [{
                    "id": 5, "title": "Hit", "preview": "p",
                    "artist": {"name": "Star"}, "album": {"title": "Best of"}
                }], "total": 1},
                "albums": {"data": []}
            }"#,
        )
        .unwrap();

        let (tracks, next) = chart.tracks.into_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].album_title, "Best of");
        assert!(tracks[0].album_cover_uri.is_none());
        assert!(next.is_none());
    }
}
