//! Error types for unpack-watch
//!
//! Every failure the pipeline can hit maps to one variant here. The pipeline
//! catches at its boundary and converts errors into status events, so nothing
//! propagates into the watcher's event loop.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::Stage;

/// Result type alias for unpack-watch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for unpack-watch
#[derive(Debug, Error)]
pub enum Error {
    /// Watched name absent from the source directory at process time
    #[error("not found: {path}")]
    NotFound {
        /// The path that was expected to exist
        path: PathBuf,
    },

    /// File size never stopped changing within the timeout
    #[error("file {path} did not stabilize within {timeout:?}")]
    StabilityTimeout {
        /// The file that kept growing
        path: PathBuf,
        /// The stability window that elapsed
        timeout: Duration,
    },

    /// Archive extension not among the recognized set
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The path with the unrecognized extension
        path: PathBuf,
    },

    /// Underlying archive reader error (corruption, unsupported encoding, I/O)
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Relocation failed (destination collision, cross-device, permissions)
    #[error("move failed from {source_path} to {destination}: {reason}")]
    Move {
        /// The item that was being moved
        source_path: PathBuf,
        /// The destination that could not be written
        destination: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// Folder watching error (subscription setup, event channel)
    #[error("folder watch error: {0}")]
    Watch(String),

    /// A watch session is already active on this watcher
    #[error("a watch session is already active")]
    SessionActive,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (persisted settings)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The pipeline stage this error belongs to, for status reporting.
    ///
    /// `Watch`, `SessionActive`, `Io`, and `Serialization` arise while setting
    /// a session up, before any item has been located, so they report as
    /// [`Stage::Session`].
    pub fn stage(&self) -> Stage {
        match self {
            Error::NotFound { .. } => Stage::Locate,
            Error::StabilityTimeout { .. } => Stage::Stability,
            Error::UnsupportedFormat { .. } | Error::Extraction { .. } => Stage::Extract,
            Error::Move { .. } => Stage::Move,
            Error::Watch(_) | Error::SessionActive | Error::Io(_) | Error::Serialization(_) => {
                Stage::Session
            }
        }
    }
}
