//! Relocation pipeline
//!
//! Orchestrates one watched item: locate it in the source directory, wait for
//! an in-progress download to stabilize, extract it if it is an archive, and
//! move the result into the target directory. All outcomes surface as status
//! events; errors never escape [`Relocator::process`], so a caller (the
//! directory watcher in particular) can invoke it from an event loop without
//! the loop dying on a bad item.

use crate::error::{Error, Result};
use crate::extraction::{self, extract_archive};
use crate::stability::StabilityWaiter;
use crate::types::{ArchiveKind, Event};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Executes the locate → stabilize → extract → move sequence for one item
pub struct Relocator {
    /// Channel for emitting status events
    event_tx: broadcast::Sender<Event>,

    /// Stability detection for files that may still be downloading
    stability: StabilityWaiter,
}

impl Relocator {
    /// Create a new pipeline bound to a status channel.
    pub fn new(event_tx: broadcast::Sender<Event>, stability: StabilityWaiter) -> Self {
        Self {
            event_tx,
            stability,
        }
    }

    /// Process the named item under `base`, relocating the result to `target`.
    ///
    /// Side-effecting; every outcome (success included) is communicated via
    /// the status channel. A failure at any stage stops this invocation:
    /// nothing is retried and a partial extraction is not rolled back. An
    /// item that was already moved by an earlier invocation simply reports
    /// "not found".
    pub async fn process(&self, base: &Path, name: &str, target: &Path) {
        match self.try_process(base, name, target).await {
            Ok(path) => {
                info!(?path, "relocation complete");
                self.event_tx.send(Event::Complete { path }).ok();
            }
            Err(e) => {
                warn!(name, error = %e, "relocation failed");
                self.event_tx
                    .send(Event::Failed {
                        stage: e.stage(),
                        error: e.to_string(),
                    })
                    .ok();
            }
        }
    }

    async fn try_process(&self, base: &Path, name: &str, target: &Path) -> Result<PathBuf> {
        let source = base.join(name);

        let metadata = fs::metadata(&source)
            .await
            .map_err(|_| Error::NotFound {
                path: source.clone(),
            })?;

        // A plain file may still be downloading; a directory is taken as-is.
        if !metadata.is_dir() && !self.stability.wait_until_stable(&source).await {
            return Err(Error::StabilityTimeout {
                path: source,
                timeout: self.stability.timeout,
            });
        }

        // Archives unpack next to themselves under their stem; the extracted
        // folder, not the archive, is what gets moved.
        let item = if ArchiveKind::classify(&source).is_archive() {
            let extract_to = base.join(stem(name));
            debug!(?source, ?extract_to, "extracting archive before move");
            extract_archive(&source, &extract_to, &self.event_tx).await?;
            self.event_tx
                .send(Event::ExtractComplete {
                    archive: extraction::display_name(&source),
                    destination: extract_to.clone(),
                })
                .ok();
            extract_to
        } else {
            source
        };

        self.move_item(&item, target).await
    }

    /// Move a file or directory into `target`, keeping its basename.
    ///
    /// Creates `target` recursively if missing. An existing destination is a
    /// terminal collision; the rename is never attempted on top of it.
    async fn move_item(&self, item: &Path, target: &Path) -> Result<PathBuf> {
        fs::create_dir_all(target).await.map_err(|e| Error::Move {
            source_path: item.to_path_buf(),
            destination: target.to_path_buf(),
            reason: format!("failed to create target directory: {}", e),
        })?;

        let basename = item.file_name().ok_or_else(|| Error::Move {
            source_path: item.to_path_buf(),
            destination: target.to_path_buf(),
            reason: "item has no basename".to_string(),
        })?;
        let destination = target.join(basename);

        self.event_tx
            .send(Event::Moving {
                source: item.to_path_buf(),
                destination: destination.clone(),
            })
            .ok();

        if fs::metadata(&destination).await.is_ok() {
            return Err(Error::Move {
                source_path: item.to_path_buf(),
                destination,
                reason: "destination already exists".to_string(),
            });
        }

        fs::rename(item, &destination)
            .await
            .map_err(|e| Error::Move {
                source_path: item.to_path_buf(),
                destination: destination.clone(),
                reason: e.to_string(),
            })?;

        Ok(destination)
    }
}

/// Extension-stripped form of a name, used as the extraction folder.
pub(crate) fn stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}
