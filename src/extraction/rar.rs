use crate::error::{Error, Result};
use crate::types::Event;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::ArchiveJob;

/// Archive extractor for RAR files
pub struct RarExtractor;

impl RarExtractor {
    /// Convert an unrar error to our error type
    fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    /// List entry names in archive order.
    pub fn list_entries(archive_path: &Path) -> Result<Vec<String>> {
        let archive = unrar::Archive::new(archive_path)
            .open_for_listing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut entries = Vec::new();
        for header in archive {
            let header = header.map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            entries.push(header.filename.to_string_lossy().into_owned());
        }

        Ok(entries)
    }

    /// Extract a RAR archive, emitting one progress event per entry.
    pub fn try_extract(
        archive_path: &Path,
        dest_path: &Path,
        event_tx: &broadcast::Sender<Event>,
    ) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting RAR extraction");

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

        let processor = unrar::Archive::new(archive_path)
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut extracted_files = Vec::new();
        let mut completed = 0;

        // Process each entry using the state machine interface
        let mut at_header = processor;
        loop {
            // Read the next header - transitions to BeforeFile state
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break, // No more entries
                Err(e) => return Err(Self::convert_unrar_error(e, archive_path)),
            };

            let header = at_file.entry();

            // Sanitize the entry path to prevent traversal (e.g. "../../etc/passwd")
            let sanitized = Path::new(&header.filename)
                .components()
                .filter(|c| matches!(c, std::path::Component::Normal(_)))
                .collect::<PathBuf>();

            if sanitized.as_os_str().is_empty() {
                warn!(entry = %header.filename.display(), "skipping entry with unsafe path");
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            } else {
                let file_path = dest_path.join(&sanitized);

                if header.is_directory() {
                    std::fs::create_dir_all(&file_path).map_err(|e| Error::Extraction {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to create directory: {}", e),
                    })?;
                    at_header = at_file
                        .skip()
                        .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
                } else {
                    // Extract the file - transitions back to BeforeHeader state
                    at_header = at_file
                        .extract_to(&file_path)
                        .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
                    extracted_files.push(file_path);
                }
            }

            completed += 1;
            event_tx
                .send(Event::Extracting {
                    archive: job.archive_name(),
                    completed,
                    total: job.total(),
                })
                .ok();
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }
}
