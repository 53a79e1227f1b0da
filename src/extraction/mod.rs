//! Archive extraction with per-entry progress
//!
//! This module extracts ZIP and RAR containers. The dispatcher classifies the
//! archive by extension and routes to the matching extractor; any other
//! extension is rejected before the filesystem is touched. Each extractor
//! first lists the archive's entries, then extracts them in listing order,
//! emitting one progress event per entry.

mod rar;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use rar::RarExtractor;
pub use zip::ZipExtractor;

use crate::error::{Error, Result};
use crate::types::{ArchiveKind, Event};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio::task::spawn_blocking;
use tracing::info;

/// One extraction job: the archive, where it unpacks to, and its entry names
/// in archive order. Transient — built per extraction call and discarded.
#[derive(Clone, Debug)]
pub struct ArchiveJob {
    /// Path to the archive file
    pub archive: PathBuf,
    /// Directory the entries unpack into
    pub destination: PathBuf,
    /// Entry names in listing order
    pub entries: Vec<String>,
}

impl ArchiveJob {
    /// Number of entries in the archive.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// The archive's basename, used in status events.
    pub fn archive_name(&self) -> String {
        display_name(&self.archive)
    }
}

/// Basename of a path as a plain string, for status events.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Unified archive extraction dispatcher
///
/// Classifies the archive by extension and routes to the ZIP or RAR
/// extractor on a blocking task. Emits [`Event::Listing`] once and
/// [`Event::Extracting`] after every entry.
///
/// The destination directory is not pre-created here; entry extraction
/// creates it (and any parents) as entries are written. An unsupported
/// extension is rejected without touching the filesystem. A mid-job failure
/// aborts the whole job; already-extracted entries are left on disk.
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Paths of the extracted files on success
/// * `Err(Error)` - `UnsupportedFormat` or `Extraction`
pub async fn extract_archive(
    archive_path: &Path,
    dest_path: &Path,
    event_tx: &broadcast::Sender<Event>,
) -> Result<Vec<PathBuf>> {
    let kind = ArchiveKind::classify(archive_path);

    let extractor: fn(&Path, &Path, &broadcast::Sender<Event>) -> Result<Vec<PathBuf>> = match kind
    {
        ArchiveKind::Zip => ZipExtractor::try_extract,
        ArchiveKind::Rar => RarExtractor::try_extract,
        ArchiveKind::Unsupported => {
            return Err(Error::UnsupportedFormat {
                path: archive_path.to_path_buf(),
            });
        }
    };

    info!(?archive_path, ?kind, ?dest_path, "dispatching extraction");

    // Extraction is blocking (zip/unrar are synchronous readers); keep it off
    // the async runtime the way the post-processing pipeline expects.
    let archive = archive_path.to_path_buf();
    let dest = dest_path.to_path_buf();
    let tx = event_tx.clone();

    spawn_blocking(move || extractor(&archive, &dest, &tx))
        .await
        .map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("extraction task panicked: {}", e),
        })?
}
