//! Library scanner populating the media index.
//!
//! The scanner walks the configured library directories, reads tags with
//! `lofty` and upserts one row per audio file into the `MediaIndex`.

use std::{
    ffi::OsStr,
    fs::{metadata, read_dir},
    path::{Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};

use {
    lofty::{
        prelude::{Accessor, TaggedFileExt},
        probe::Probe,
    },
    tokio::task::spawn_blocking,
    tracing::{debug, warn},
};

use crate::{
    error::LibraryError,
    library::{database::MediaIndex, models::NewMediaEntry},
};

/// File extensions considered audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav"];

/// Directory names whose contents are indexed but not listed as music.
const NON_MUSIC_DIRS: &[&str] = &["ringtones", "notifications", "alarms", "podcasts"];

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files written to the index.
    pub indexed: usize,
    /// Audio files whose tags could not be read.
    pub skipped: usize,
}

/// Walks library directories and feeds the media index.
pub struct LibraryScanner {
    index: Arc<MediaIndex>,
}

impl LibraryScanner {
    /// Creates a scanner writing into `index`.
    #[must_use]
    pub fn new(index: Arc<MediaIndex>) -> Self {
        Self { index }
    }

    /// Scans every directory in `directories` recursively.
    ///
    /// Unreadable directories and untaggable files are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if writing to the index fails.
    pub async fn scan_directories(
        &self,
        directories: &[String],
    ) -> Result<ScanSummary, LibraryError> {
        let roots: Vec<PathBuf> = directories.iter().map(PathBuf::from).collect();

        let (entries, skipped) = spawn_blocking(move || {
            let mut files = Vec::new();
            for root in &roots {
                collect_audio_files(root, &mut files);
            }

            let mut entries = Vec::with_capacity(files.len());
            let mut skipped = 0;
            for file in files {
                match read_entry(&file) {
                    Some(entry) => entries.push(entry),
                    None => skipped += 1,
                }
            }
            (entries, skipped)
        })
        .await
        .map_err(|e| LibraryError::InvalidData {
            reason: format!("scan task failed: {e}"),
        })?;

        let mut summary = ScanSummary {
            indexed: 0,
            skipped,
        };
        for entry in &entries {
            self.index.upsert_track(entry).await?;
            summary.indexed += 1;
        }

        debug!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            "Library scan finished"
        );
        Ok(summary)
    }
}

/// Returns whether `path` has a known audio extension.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Returns whether `path` lies under a ringtone/alarm style directory.
#[must_use]
pub fn is_music_path(path: &Path) -> bool {
    !path.ancestors().skip(1).any(|dir| {
        dir.file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| NON_MUSIC_DIRS.contains(&name.to_lowercase().as_str()))
    })
}

fn collect_audio_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_audio_files(&path, files);
        } else if is_audio_file(&path) {
            files.push(path);
        }
    }
}

fn read_entry(path: &Path) -> Option<NewMediaEntry> {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(tagged_file) => tagged_file,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let file_stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string();

    let title = tag
        .and_then(|t| t.title().map(|s| s.into_owned()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(file_stem);
    let artist = tag
        .and_then(|t| t.artist().map(|s| s.into_owned()))
        .unwrap_or_default();
    let album = tag
        .and_then(|t| t.album().map(|s| s.into_owned()))
        .unwrap_or_default();

    let date_added = metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(0);

    Some(NewMediaEntry {
        title,
        artist,
        path: path.to_string_lossy().into_owned(),
        album,
        is_music: is_music_path(path),
        date_added,
    })
}
