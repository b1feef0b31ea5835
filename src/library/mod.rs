//! On-device media index.
//!
//! This module contains the track model, the SQLite-backed media index that
//! the local repository queries, and the scanner that fills it.

pub mod database;
pub mod models;
pub mod scanner;
pub mod schema;

pub use {
    database::MediaIndex,
    models::{MediaRow, NewMediaEntry, Track},
    scanner::{LibraryScanner, ScanSummary},
};
