//! Domain-specific error types using `thiserror`.
//!
//! This module defines the main error enums for the different domains
//! of Tuneline: track fetching, playback control, and the media index.

use {
    reqwest::Error as ReqwestError, serde_json::Error as SerdeJsonError, sqlx::Error as SqlxError,
    thiserror::Error,
};

use crate::library::schema::SchemaError;

/// Errors raised by track repositories.
///
/// Every failure of the underlying source (HTTP call, index query, response
/// parsing) is reported as a `DataFetchError`. Cancellation is not an error:
/// a cancelled fetch simply never commits.
#[derive(Error, Debug)]
pub enum DataFetchError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] ReqwestError),
    /// The remote API answered with a non-success status.
    #[error("Unexpected response status {code}: {body}")]
    Status { code: u16, body: String },
    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] SerdeJsonError),
    /// The media index query failed.
    #[error("Media index error: {0}")]
    Index(#[from] LibraryError),
    /// Blank search queries are routed to `get_tracks` by callers.
    #[error("Search query must not be blank")]
    InvalidQuery,
    /// The source reported a failure with its own message.
    #[error("{0}")]
    Unavailable(String),
}

impl DataFetchError {
    /// Creates an `Unavailable` error carrying the source's message verbatim.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Playback control errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlayerError {
    /// The requested start index does not point into the playlist.
    #[error("Track index {index} out of range for playlist of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Media index errors.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),
    /// Schema initialization error.
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),
    /// Invalid file path or metadata.
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },
}
