//! Tuneline - headless playback and listing service
//!
//! Loads the user settings, indexes the configured library directories,
//! wires the shared player to the local and remote listings and keeps the
//! session alive until interrupted.

use {
    anyhow::Result,
    tokio::signal::ctrl_c,
    tracing::{info, warn},
};

use tuneline::{
    AppContext, ListViewState, SettingsManager,
    error::{ErrorReporter, ResultExt},
    logging::init_logging,
};

/// Logs a one-line summary of a listing's state.
fn log_listing(name: &str, state: &ListViewState) {
    match state {
        ListViewState::Success { tracks, .. } => info!("{}: {} tracks", name, tracks.len()),
        ListViewState::Empty => info!("{}: no tracks", name),
        ListViewState::Error { message } => warn!("{}: {}", name, message),
        ListViewState::Loading => info!("{}: loading", name),
    }
}

/// Main entry point for the Tuneline service.
#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let settings_manager = SettingsManager::new().add_context("Failed to load settings")?;
    let settings = settings_manager.get_settings().clone();
    info!(
        "Settings loaded from {}",
        settings_manager.get_config_path().display()
    );

    let context = AppContext::new(settings).await?;
    if let Err(error) = context.scan_library().await {
        ErrorReporter::warn(&*error, "Continuing with the existing media index");
    }

    context.local_tracks.load_tracks();
    context.remote_tracks.load_tracks();

    let mut local = context.local_tracks.subscribe();
    let mut remote = context.remote_tracks.subscribe();
    let mut playback = context.playback.subscribe();

    loop {
        tokio::select! {
            _ = ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            Ok(()) = local.changed() => log_listing("Local", &local.borrow_and_update()),
            Ok(()) = remote.changed() => log_listing("Remote", &remote.borrow_and_update()),
            Ok(()) = playback.changed() => {
                let state = playback.borrow_and_update();
                if let Some(track) = &state.current_track {
                    info!(
                        "Now {}: {} - {} ({:.0}%)",
                        if state.is_playing { "playing" } else { "paused" },
                        track.artist,
                        track.title,
                        state.progress * 100.0
                    );
                }
            }
        }
    }

    Ok(())
}
