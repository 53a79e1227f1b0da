//! Directory watching for a named download
//!
//! Subscribes to non-recursive creation events on the source directory and
//! runs the relocation pipeline when the watched name appears. A session has
//! two states: idle (constructed, not subscribed) and watching (subscribed,
//! event loop running). The only way out of watching is cancellation; a
//! successful move does not stop the session, so a new item with the same
//! name triggers the pipeline again later.
//!
//! # Example
//!
//! ```no_run
//! use unpack_watch::{DirectoryWatcher, WatchRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = WatchRequest::new("/downloads", "report.zip", "/archive");
//! let mut watcher = DirectoryWatcher::new(request)?;
//!
//! let mut events = watcher.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event);
//!     }
//! });
//!
//! watcher.start()?;
//! let cancel = watcher.cancel_handle();
//! let session = tokio::spawn(watcher.run());
//!
//! // ... later: stop the session
//! cancel.cancel();
//! session.await?;
//! # Ok(())
//! # }
//! ```

use crate::config::WatchRequest;
use crate::error::{Error, Result};
use crate::extraction::{self, extract_archive};
use crate::pipeline::{Relocator, stem};
use crate::stability::StabilityWaiter;
use crate::types::{ArchiveKind, Event};
use notify::{
    Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::Path;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Watch session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WatchState {
    /// Constructed but not subscribed
    Idle,
    /// Subscribed to the source directory
    Watching,
}

/// Watches the source directory and relocates the watched name when it appears
pub struct DirectoryWatcher {
    /// Filesystem watcher instance
    watcher: RecommendedWatcher,

    /// Channel for receiving filesystem events
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,

    /// Session parameters, immutable for the watcher's lifetime
    request: WatchRequest,

    /// Relocation pipeline invoked for matching events
    relocator: Relocator,

    /// Stability detection for arriving archives
    stability: StabilityWaiter,

    /// Channel for emitting status events
    event_tx: broadcast::Sender<Event>,

    /// Cancellation signal ending the session
    cancel: CancellationToken,

    /// Idle or watching
    state: WatchState,
}

impl DirectoryWatcher {
    /// Create a new watcher for one session.
    ///
    /// # Errors
    /// Returns an error if the filesystem watcher cannot be initialized.
    pub fn new(request: WatchRequest) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = tx.send(res) {
                    error!("failed to forward filesystem event: {}", e);
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::Watch(e.to_string()))?;

        let (event_tx, _) = broadcast::channel(256);
        let stability = StabilityWaiter::default();

        Ok(Self {
            watcher,
            rx,
            request,
            relocator: Relocator::new(event_tx.clone(), stability),
            stability,
            event_tx,
            cancel: CancellationToken::new(),
            state: WatchState::Idle,
        })
    }

    /// Replace the stability waiter (shorter windows for tests, fast disks).
    pub fn stability_waiter(mut self, stability: StabilityWaiter) -> Self {
        self.stability = stability;
        self.relocator = Relocator::new(self.event_tx.clone(), stability);
        self
    }

    /// Subscribe to the session's status events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that ends the session when cancelled.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start watching the source directory.
    ///
    /// Creates the directory if it does not exist and subscribes to
    /// non-recursive events on it.
    ///
    /// # Errors
    /// Returns [`Error::SessionActive`] if this watcher is already watching,
    /// or [`Error::Watch`] if the subscription cannot be established.
    pub fn start(&mut self) -> Result<()> {
        if self.state == WatchState::Watching {
            return Err(Error::SessionActive);
        }

        if !self.request.source_dir.exists() {
            std::fs::create_dir_all(&self.request.source_dir)
                .map_err(|e| Error::Watch(format!("failed to create source directory: {}", e)))?;
            info!(path = ?self.request.source_dir, "created source directory");
        }

        self.watcher
            .watch(&self.request.source_dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("failed to watch directory: {}", e)))?;
        self.state = WatchState::Watching;

        info!(
            source = ?self.request.source_dir,
            watched_name = %self.request.watched_name,
            target = ?self.request.target_dir,
            "watching for named item"
        );

        Ok(())
    }

    /// Run the watcher event loop until cancellation.
    ///
    /// Events are handled one at a time, in arrival order, on this task;
    /// a stability wait blocks later events for the session by design.
    /// Failures are reported on the status channel and never end the loop.
    pub async fn run(mut self) {
        info!("directory watcher started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("watch session cancelled");
                    break;
                }
                received = self.rx.recv() => match received {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => error!("filesystem watcher error: {}", e),
                    None => {
                        warn!("filesystem event channel closed");
                        break;
                    }
                },
            }
        }

        // Dropping the watcher releases the subscription
        drop(self.watcher);
        info!("directory watcher stopped");
    }

    /// Handle a filesystem event, filtering for creation of the watched name.
    async fn handle_event(&self, event: notify::Event) {
        if !matches!(event.kind, EventKind::Create(_)) {
            return;
        }

        for path in &event.paths {
            if self.matches_watched_name(path) {
                self.process_created(path).await;
            } else {
                debug!(?path, "ignoring creation event for non-watched name");
            }
        }
    }

    /// Check if a created path's basename is the watched name.
    fn matches_watched_name(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == self.request.watched_name)
            .unwrap_or(false)
    }

    /// Process a creation event for the watched name.
    ///
    /// An arriving archive is waited on and extracted here, then the pipeline
    /// picks up the extracted folder so it is moved rather than re-extracted.
    /// Anything else goes straight through the pipeline.
    async fn process_created(&self, path: &Path) {
        debug!(?path, "watched name appeared");

        let request = &self.request;
        if ArchiveKind::classify(path).is_archive() {
            if !self.stability.wait_until_stable(path).await {
                let err = Error::StabilityTimeout {
                    path: path.to_path_buf(),
                    timeout: self.stability.timeout,
                };
                warn!(?path, "arriving archive never stabilized");
                self.event_tx
                    .send(Event::Failed {
                        stage: err.stage(),
                        error: err.to_string(),
                    })
                    .ok();
                return;
            }

            let extract_to = request.source_dir.join(stem(&request.watched_name));
            match extract_archive(path, &extract_to, &self.event_tx).await {
                Ok(_) => {
                    self.event_tx
                        .send(Event::ExtractComplete {
                            archive: extraction::display_name(path),
                            destination: extract_to.clone(),
                        })
                        .ok();

                    // Hand the extracted folder's basename to the pipeline so
                    // the folder is moved, not the archive re-extracted.
                    let extracted_name = extraction::display_name(&extract_to);
                    self.relocator
                        .process(&request.source_dir, &extracted_name, &request.target_dir)
                        .await;
                }
                Err(e) => {
                    warn!(?path, error = %e, "failed to extract arriving archive");
                    self.event_tx
                        .send(Event::Failed {
                            stage: e.stage(),
                            error: e.to_string(),
                        })
                        .ok();
                }
            }
        } else {
            self.relocator
                .process(
                    &request.source_dir,
                    &request.watched_name,
                    &request.target_dir,
                )
                .await;
        }
    }
}
