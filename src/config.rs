//! Configuration types for unpack-watch
//!
//! [`Settings`] is the persisted record: three strings, read wholesale at
//! startup and written wholesale when a session starts. [`WatchRequest`] is
//! the immutable value a session runs with; callers build one from user input
//! (or from loaded settings) and hand it to the watcher.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Last-used session values, persisted as a whole record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory watched for the named item
    #[serde(default)]
    pub source_dir: PathBuf,

    /// File or folder basename to wait for
    #[serde(default)]
    pub watched_name: String,

    /// Directory the processed item is moved into
    #[serde(default)]
    pub target_dir: PathBuf,
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// An absent file yields empty defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write settings to a JSON file, overwriting the whole record.
    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Build the session request these settings describe.
    pub fn to_request(&self) -> WatchRequest {
        WatchRequest {
            source_dir: self.source_dir.clone(),
            watched_name: self.watched_name.clone(),
            target_dir: self.target_dir.clone(),
        }
    }
}

impl From<&WatchRequest> for Settings {
    fn from(request: &WatchRequest) -> Self {
        Self {
            source_dir: request.source_dir.clone(),
            watched_name: request.watched_name.clone(),
            target_dir: request.target_dir.clone(),
        }
    }
}

/// Parameters for one watch session, immutable for its lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchRequest {
    /// Directory watched for the named item
    pub source_dir: PathBuf,

    /// File or folder basename to wait for
    pub watched_name: String,

    /// Directory the processed item is moved into
    pub target_dir: PathBuf,
}

impl WatchRequest {
    /// Create a new session request.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        watched_name: impl Into<String>,
        target_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            watched_name: watched_name.into(),
            target_dir: target_dir.into(),
        }
    }
}
