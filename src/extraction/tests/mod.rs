use crate::error::Error;
use crate::extraction::*;
use crate::types::Event;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::broadcast;
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn event_channel() -> (broadcast::Sender<Event>, broadcast::Receiver<Event>) {
    broadcast::channel(64)
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Create a valid ZIP archive containing the given files, in order
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_extension_is_rejected_without_touching_the_filesystem() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("data.7z");
    std::fs::write(&archive, b"whatever").unwrap();
    let dest = temp_dir.path().join("data");
    let (tx, mut rx) = event_channel();

    let result = extract_archive(&archive, &dest, &tx).await;

    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    assert!(!dest.exists(), "destination must not be created");
    assert!(drain(&mut rx).is_empty(), "no events for a rejected format");
}

#[tokio::test]
async fn extension_without_archive_suffix_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("plainfile");
    std::fs::write(&path, b"data").unwrap();
    let (tx, _rx) = event_channel();

    let result = extract_archive(&path, &temp_dir.path().join("out"), &tx).await;
    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
}

#[tokio::test]
async fn rar_extension_dispatches_to_the_rar_extractor() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("data.rar");
    std::fs::write(&archive, b"not a real rar archive").unwrap();
    let (tx, _rx) = event_channel();

    // The reader rejects the bogus container, proving dispatch went to RAR
    let result = extract_archive(&archive, &temp_dir.path().join("data"), &tx).await;
    assert!(matches!(result, Err(Error::Extraction { .. })));
}

// ---------------------------------------------------------------------------
// ZIP extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zip_extraction_reports_progress_once_per_entry() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("report.zip");
    create_zip_archive(
        &archive,
        &[("a.txt", b"alpha"), ("b.txt", b"beta"), ("c.txt", b"gamma")],
    );
    let dest = temp_dir.path().join("report");
    let (tx, mut rx) = event_channel();

    let files = extract_archive(&archive, &dest, &tx).await.unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(count_files(&dest), 3);
    assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"alpha");

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(Event::Listing { entries: 3, .. })
    ));
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Extracting {
                completed, total, ..
            } => Some((*completed, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn zip_destination_is_created_by_entry_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("nested.zip");
    create_zip_archive(&archive, &[("docs/inner/file.txt", b"deep")]);
    let dest = temp_dir.path().join("nested");
    assert!(!dest.exists());
    let (tx, _rx) = event_channel();

    extract_archive(&archive, &dest, &tx).await.unwrap();

    assert_eq!(
        std::fs::read(dest.join("docs").join("inner").join("file.txt")).unwrap(),
        b"deep"
    );
}

#[tokio::test]
async fn zip_traversal_entries_are_skipped_but_still_counted() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("sneaky.zip");
    create_zip_archive(&archive, &[("../evil.txt", b"nope"), ("ok.txt", b"fine")]);
    let dest = temp_dir.path().join("sneaky");
    let (tx, mut rx) = event_channel();

    let files = extract_archive(&archive, &dest, &tx).await.unwrap();

    assert_eq!(files.len(), 1, "only the safe entry is written");
    assert!(dest.join("ok.txt").exists());
    assert!(!temp_dir.path().join("evil.txt").exists());

    // The progress counter still advances for the skipped entry
    let progress = drain(&mut rx)
        .iter()
        .filter(|e| matches!(e, Event::Extracting { .. }))
        .count();
    assert_eq!(progress, 2);
}

#[tokio::test]
async fn zip_list_entries_preserves_archive_order() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("ordered.zip");
    create_zip_archive(
        &archive,
        &[("z_last.txt", b"1"), ("a_first.txt", b"2"), ("m.txt", b"3")],
    );

    let entries = ZipExtractor::list_entries(&archive).unwrap();
    assert_eq!(entries, vec!["z_last.txt", "a_first.txt", "m.txt"]);
}

#[tokio::test]
async fn corrupt_zip_fails_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.zip");
    std::fs::write(&archive, b"definitely not a zip file").unwrap();
    let dest = temp_dir.path().join("broken");
    let (tx, _rx) = event_channel();

    let result = extract_archive(&archive, &dest, &tx).await;
    assert!(matches!(result, Err(Error::Extraction { .. })));
    assert!(!dest.exists());
}

#[tokio::test]
async fn missing_zip_fails_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("absent.zip");
    let (tx, _rx) = event_channel();

    let result = extract_archive(&archive, &temp_dir.path().join("absent"), &tx).await;
    assert!(matches!(result, Err(Error::Extraction { .. })));
}

// ---------------------------------------------------------------------------
// ArchiveJob
// ---------------------------------------------------------------------------

#[test]
fn archive_job_exposes_total_and_display_name() {
    let job = ArchiveJob {
        archive: "/downloads/report.zip".into(),
        destination: "/downloads/report".into(),
        entries: vec!["a.txt".to_string(), "b.txt".to_string()],
    };
    assert_eq!(job.total(), 2);
    assert_eq!(job.archive_name(), "report.zip");
}

// ---------------------------------------------------------------------------
// RAR error paths (fixtures would need an external rar binary; the reader's
// rejection of bogus input covers the failure branch)
// ---------------------------------------------------------------------------

#[test]
fn rar_listing_of_bogus_container_fails() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bogus.rar");
    std::fs::write(&archive, b"Rar!but not really").unwrap();

    assert!(RarExtractor::list_entries(&archive).is_err());
}
