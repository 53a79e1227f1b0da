//! # unpack-watch
//!
//! Watch a source directory for a named file or folder, extract it when it is
//! a ZIP or RAR archive, and move the result into a target directory.
//!
//! ## Design Philosophy
//!
//! unpack-watch is designed to be:
//! - **Library-first** - No UI or CLI; a desktop form or script drives it
//! - **Event-driven** - Consumers subscribe to status events, no polling
//! - **Boring on failure** - Every failure becomes a status line; the watch
//!   session keeps running and a later event retries naturally
//!
//! ## Quick Start
//!
//! ```no_run
//! use unpack_watch::{DirectoryWatcher, Settings, WatchRequest, run_with_shutdown};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Persisted settings: last-used values, overwritten at session start.
//!     let settings_path = Path::new("unpack-watch.json");
//!     let settings = Settings::load(settings_path)?;
//!
//!     let request = if settings.watched_name.is_empty() {
//!         WatchRequest::new("/downloads", "report.zip", "/archive")
//!     } else {
//!         settings.to_request()
//!     };
//!     Settings::from(&request).store(settings_path)?;
//!
//!     let watcher = DirectoryWatcher::new(request)?;
//!
//!     // Print status lines as they arrive
//!     let mut events = watcher.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{}", event);
//!         }
//!     });
//!
//!     // Watch until Ctrl+C / SIGTERM
//!     run_with_shutdown(watcher).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Persisted settings and session parameters
pub mod config;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Relocation pipeline
pub mod pipeline;
/// Download-stability detection
pub mod stability;
/// Core types and status events
pub mod types;
/// Directory watching for a named download
pub mod watcher;

// Re-export commonly used types
pub use config::{Settings, WatchRequest};
pub use error::{Error, Result};
pub use extraction::{ArchiveJob, RarExtractor, ZipExtractor, extract_archive};
pub use pipeline::Relocator;
pub use stability::StabilityWaiter;
pub use types::{ArchiveKind, Event, Stage};
pub use watcher::DirectoryWatcher;

/// Run a watch session until a termination signal arrives.
///
/// Starts the session, parks on a signal, then cancels the watcher task and
/// waits for it to wind down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use unpack_watch::{DirectoryWatcher, WatchRequest, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let request = WatchRequest::new("/downloads", "report.zip", "/archive");
///     let watcher = DirectoryWatcher::new(request)?;
///     run_with_shutdown(watcher).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(mut watcher: DirectoryWatcher) -> Result<()> {
    watcher.start()?;
    let cancel = watcher.cancel_handle();
    let session = tokio::spawn(watcher.run());

    wait_for_signal().await;
    cancel.cancel();

    if let Err(e) = session.await {
        tracing::error!(error = %e, "watcher task ended abnormally");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to ctrl_c
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("SIGTERM, shutting down"),
                _ = sigint.recv() => tracing::info!("SIGINT, shutting down"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "no SIGINT handler, SIGTERM only");
            sigterm.recv().await;
            tracing::info!("SIGTERM, shutting down");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "no SIGTERM handler, SIGINT only");
            sigint.recv().await;
            tracing::info!("SIGINT, shutting down");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "signal registration failed, using ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
    } else {
        tracing::info!("Ctrl+C, shutting down");
    }
}
