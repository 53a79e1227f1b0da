use crate::error::{Error, Result};
use crate::types::Event;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::ArchiveJob;

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// List entry names in archive order.
    pub fn list_entries(archive_path: &Path) -> Result<Vec<String>> {
        let file = std::fs::File::open(archive_path).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to open ZIP archive: {}", e),
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| Error::Extraction {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry {}: {}", i, e),
            })?;
            entries.push(entry.name().to_string());
        }

        Ok(entries)
    }

    /// Extract a single ZIP entry to disk, creating parent directories as needed
    ///
    /// Returns the written file path, or `None` for directory entries and
    /// entries whose path escapes the destination (skipped with a warning).
    fn extract_entry(
        mut entry: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match entry.enclosed_name() {
            Some(relative) => dest_path.join(relative),
            None => {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| Error::Extraction {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to create directory: {}", e),
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Extraction {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to create parent directories: {}", e),
            })?;
        }

        let mut outfile = std::fs::File::create(&file_path).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to create output file: {}", e),
        })?;

        std::io::copy(&mut entry, &mut outfile).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to extract entry: {}", e),
        })?;

        Ok(Some(file_path))
    }

    /// Extract a ZIP archive, emitting one progress event per entry.
    pub fn try_extract(
        archive_path: &Path,
        dest_path: &Path,
        event_tx: &broadcast::Sender<Event>,
    ) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let job = ArchiveJob {
            archive: archive_path.to_path_buf(),
            destination: dest_path.to_path_buf(),
            entries: Self::list_entries(archive_path)?,
        };

        event_tx
            .send(Event::Listing {
                archive: job.archive_name(),
                entries: job.total(),
            })
            .ok();

        let file = std::fs::File::open(archive_path).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to open ZIP archive: {}", e),
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..job.total() {
            let entry = archive.by_index(i).map_err(|e| Error::Extraction {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry {}: {}", i, e),
            })?;

            if let Some(file_path) = Self::extract_entry(entry, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }

            event_tx
                .send(Event::Extracting {
                    archive: job.archive_name(),
                    completed: i + 1,
                    total: job.total(),
                })
                .ok();
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
