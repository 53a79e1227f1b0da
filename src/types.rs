//! Core types for unpack-watch

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Archive container format detected by file extension
///
/// Classification is a pure function of the path; everything downstream
/// dispatches on this enum instead of re-checking extension strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// ZIP archive (.zip)
    Zip,
    /// RAR archive (.rar)
    Rar,
    /// Not a recognized archive container
    Unsupported,
}

impl ArchiveKind {
    /// Classify a path by its extension (case-insensitive).
    pub fn classify(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return ArchiveKind::Unsupported;
        };

        match ext.to_lowercase().as_str() {
            "zip" => ArchiveKind::Zip,
            "rar" => ArchiveKind::Rar,
            _ => ArchiveKind::Unsupported,
        }
    }

    /// Whether this is one of the recognized archive containers.
    pub fn is_archive(&self) -> bool {
        !matches!(self, ArchiveKind::Unsupported)
    }
}

/// Pipeline stage, used to attribute failures in status events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Locating the watched name in the source directory
    Locate,
    /// Waiting for the file size to stop changing
    Stability,
    /// Archive extraction
    Extract,
    /// Move to the target directory
    Move,
    /// Session setup and teardown, outside any per-item stage
    Session,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Locate => "locate",
            Stage::Stability => "stability",
            Stage::Extract => "extract",
            Stage::Move => "move",
            Stage::Session => "session",
        };
        write!(f, "{}", name)
    }
}

/// Status event emitted while a watched item is processed
///
/// Consumers subscribe via [`DirectoryWatcher::subscribe`](crate::DirectoryWatcher::subscribe)
/// (or construct a [`Relocator`](crate::Relocator) with their own channel).
/// The `Display` impl renders each event as a human-readable status line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Archive entry listing obtained
    Listing {
        /// Archive filename
        archive: String,
        /// Number of entries in the archive
        entries: usize,
    },

    /// Extraction progress, emitted once per entry
    Extracting {
        /// Archive filename
        archive: String,
        /// Entries extracted so far
        completed: usize,
        /// Total entries in the archive
        total: usize,
    },

    /// Archive extraction completed
    ExtractComplete {
        /// Archive filename
        archive: String,
        /// Directory the entries were extracted into
        destination: PathBuf,
    },

    /// Moving the item to its destination
    Moving {
        /// Current path of the item
        source: PathBuf,
        /// Destination path
        destination: PathBuf,
    },

    /// Item successfully relocated
    Complete {
        /// Final path of the item
        path: PathBuf,
    },

    /// Processing failed at some stage
    Failed {
        /// Stage where the failure occurred
        stage: Stage,
        /// Error message
        error: String,
    },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Listing { archive, entries } => {
                write!(f, "listing {}: {} entries", archive, entries)
            }
            Event::Extracting {
                archive,
                completed,
                total,
            } => write!(f, "extracting {}: {}/{}", archive, completed, total),
            Event::ExtractComplete {
                archive,
                destination,
            } => write!(f, "extracted {} into {}", archive, destination.display()),
            Event::Moving {
                source,
                destination,
            } => write!(
                f,
                "moving {} to {}",
                source.display(),
                destination.display()
            ),
            Event::Complete { path } => write!(f, "done: {}", path.display()),
            Event::Failed { stage, error } => write!(f, "failed during {}: {}", stage, error),
        }
    }
}
