//! Operational error context propagation with `anyhow`.
//!
//! This module provides extension traits and utilities for enhancing
//! error context and centralized error reporting.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Result as AnyhowResult},
    tracing::warn,
};

/// Extension trait for enhanced error context.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized error reporting and logging.
///
/// View models report repository and playback failures here so that every
/// failure is logged with the same fields before it reaches the user.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Reports a recoverable failure surfaced to the user.
    pub fn warn(error: &dyn StdError, context: &str) {
        warn!(context = context, error = %error, "Operation failed");
    }

    /// Converts an error to the message shown on screen.
    ///
    /// Only the top-level display text is used; source chains stay in the logs.
    pub fn to_user_message(error: &dyn StdError) -> String {
        error.to_string()
    }
}
