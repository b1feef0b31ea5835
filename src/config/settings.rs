//! User preference management with XDG Base Directory compliance.
//!
//! This module provides user settings management with proper XDG directory
//! usage for the settings file, the media index database and album art.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
    time::Duration,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Default remote catalogue endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.deezer.com";

/// Default number of tracks fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Base URL of the remote track catalogue.
    pub api_base_url: String,
    /// Number of tracks fetched per page by both repositories.
    pub page_size: u32,
    /// Interval of the playback progress poll in milliseconds.
    pub progress_poll_interval_ms: u64,
    /// Delay before re-reading an unknown track duration.
    pub duration_retry_delay_ms: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Music library directories indexed by the scanner.
    pub library_directories: Vec<String>,
    /// Directory holding `<album_id>.jpg` album covers.
    pub album_art_dir: Option<String>,
    /// Location of the media index database (defaults to the cache dir).
    pub database_path: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            progress_poll_interval_ms: 200,
            duration_retry_delay_ms: 200,
            request_timeout_secs: 30,
            library_directories: vec![],
            album_art_dir: None,
            database_path: None,
        }
    }
}

impl UserSettings {
    /// Checks that numeric settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for a zero page size or poll interval.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.page_size == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "page_size must be greater than zero".to_string(),
            });
        }
        if self.progress_poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "progress_poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Progress poll interval as a `Duration`.
    #[must_use]
    pub fn progress_poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress_poll_interval_ms)
    }

    /// Duration retry delay as a `Duration`.
    #[must_use]
    pub fn duration_retry_delay(&self) -> Duration {
        Duration::from_millis(self.duration_retry_delay_ms)
    }

    /// HTTP request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved media index database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.as_ref().map_or_else(
            || get_cache_dir().join("media_index.db"),
            PathBuf::from,
        )
    }

    /// Resolved album art directory.
    #[must_use]
    pub fn album_art_dir(&self) -> PathBuf {
        self.album_art_dir
            .as_ref()
            .map_or_else(|| get_cache_dir().join("albumart"), PathBuf::from)
    }
}

/// Handles loading, saving, and validation of user preferences.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk or are invalid.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings: UserSettings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("No settings file at {:?}, using defaults", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Updates the settings and saves them to disk.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings are invalid or cannot be saved.
    pub fn update_settings(&self, new_settings: UserSettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        *self.settings.write() = new_settings;
        self.save_settings()
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path of the settings file under the XDG config home.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_home("XDG_CONFIG_HOME", ".config");
    config_dir.push("tuneline");
    config_dir.push("settings.json");
    config_dir
}

/// Gets the cache directory path.
#[must_use]
pub fn get_cache_dir() -> PathBuf {
    let mut cache_dir = get_xdg_home("XDG_CACHE_HOME", ".cache");
    cache_dir.push("tuneline");
    cache_dir
}

/// Resolves an XDG base directory, falling back to `$HOME/<fallback>`.
fn get_xdg_home(variable: &str, fallback: &str) -> PathBuf {
    if let Ok(home) = var(variable)
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(fallback);
        return path;
    }

    PathBuf::from(".")
}
