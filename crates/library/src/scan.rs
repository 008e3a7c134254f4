use std::fs;
use std::path::Path;

use common::{audio_extension, is_audio_file, now_secs, stable_id, ScanStatus, Track};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{Library, LibraryError};

#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub log_id: String,
    pub files_found: u32,
    pub files_added: u32,
    pub errors: Vec<String>,
}

/// Scans the given folders into the catalog. Re-scanning is idempotent: files
/// whose path is already cataloged are skipped, so a second pass over an
/// unchanged tree adds nothing. Per-file failures are recorded and never stop
/// the batch; only a catalog failure in the bookkeeping around the batch is
/// fatal and marks the audit row failed.
pub fn scan_folders(library: &Library, folders: &[String]) -> Result<ScanOutcome, LibraryError> {
    let log = library.create_scan_log(folders)?;
    let mut files_found = 0u32;
    let mut files_added = 0u32;
    let mut errors: Vec<String> = Vec::new();

    for folder in folders {
        info!("Scanning {}", folder);
        for entry in WalkDir::new(folder) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push(format!("{}: {}", folder, err));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
                continue;
            }
            files_found += 1;
            match scan_file(library, entry.path()) {
                Ok(true) => files_added += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!("Failed to process {:?}: {}", entry.path(), err);
                    errors.push(format!("{}: {}", entry.path().display(), err));
                }
            }
        }
    }

    // Full reconciliation pass over every album, not just touched ones.
    if let Err(err) = library.recompute_album_aggregates() {
        let _ = library.finish_scan_log(
            &log.id,
            ScanStatus::Failed,
            files_found,
            files_added,
            &errors,
        );
        return Err(err);
    }

    library.finish_scan_log(
        &log.id,
        ScanStatus::Completed,
        files_found,
        files_added,
        &errors,
    )?;
    info!(
        "Scan finished: {} files found, {} tracks added, {} errors",
        files_found,
        files_added,
        errors.len()
    );

    Ok(ScanOutcome {
        log_id: log.id,
        files_found,
        files_added,
        errors,
    })
}

fn scan_file(library: &Library, path: &Path) -> Result<bool, LibraryError> {
    let file_path = path.to_string_lossy().to_string();
    if library.get_track_by_path(&file_path)?.is_some() {
        return Ok(false);
    }

    let file_size = fs::metadata(path)?.len();
    let format = audio_extension(path).unwrap_or_default();
    let resolved = metadata::resolve(path);

    let artist = library.find_or_create_artist(&resolved.artist)?;
    let album = library.find_or_create_album(
        &resolved.album,
        &artist.id,
        resolved.year,
        resolved.genre.clone(),
    )?;

    let track = Track {
        id: stable_id(&file_path),
        artist_id: artist.id,
        album_id: album.id,
        title: resolved.title,
        track_no: resolved.track_no,
        disc_no: resolved.disc_no,
        duration_secs: resolved.duration_secs,
        bitrate_kbps: resolved.bitrate_kbps,
        sample_rate_hz: resolved.sample_rate_hz,
        format,
        file_size,
        file_path,
        genre: resolved.genre,
        year: resolved.year,
        lyrics: None,
        lyrics_type: None,
        play_count: 0,
        rating: 0,
        created_at: now_secs(),
    };
    Ok(library.insert_track(track)?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use common::ScanStatus;
    use tempfile::TempDir;

    use super::scan_folders;
    use crate::tests::open_library;

    fn write_file(dir: &TempDir, relpath: &str) {
        let path = dir.path().join(relpath);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Not a real audio stream; tag extraction fails and the resolver
        // falls back to filename metadata.
        fs::write(path, b"not really audio").unwrap();
    }

    #[test]
    fn scan_picks_up_audio_files_and_skips_the_rest() {
        let db_dir = TempDir::new().unwrap();
        let music = TempDir::new().unwrap();
        write_file(&music, "Slint - Breadcrumb Trail.mp3");
        write_file(&music, "nested/Slint - Nosferatu Man.FLAC");
        write_file(&music, "cover.jpg");
        write_file(&music, "notes.txt");

        let library = open_library(&db_dir);
        let outcome = scan_folders(
            &library,
            &[music.path().to_string_lossy().to_string()],
        )
        .unwrap();

        assert_eq!(outcome.files_found, 2);
        assert_eq!(outcome.files_added, 2);
        assert!(outcome.errors.is_empty());

        let tracks = library.list_tracks().unwrap();
        assert_eq!(tracks.len(), 2);
        let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert!(titles.contains(&"Breadcrumb Trail"));
        assert!(titles.contains(&"Nosferatu Man"));

        // Filename fallback attributes both files to the same artist, and
        // the missing album tag lands them in "Unknown Album".
        assert_eq!(library.list_artists().unwrap().len(), 1);
        let albums = library.list_albums().unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Unknown Album");
        assert_eq!(albums[0].track_count, 2);
    }

    #[test]
    fn rescan_adds_nothing() {
        let db_dir = TempDir::new().unwrap();
        let music = TempDir::new().unwrap();
        write_file(&music, "Low - Words.mp3");

        let library = open_library(&db_dir);
        let folders = vec![music.path().to_string_lossy().to_string()];
        let first = scan_folders(&library, &folders).unwrap();
        assert_eq!(first.files_added, 1);

        let second = scan_folders(&library, &folders).unwrap();
        assert_eq!(second.files_found, 1);
        assert_eq!(second.files_added, 0);
        assert_eq!(library.list_tracks().unwrap().len(), 1);
    }

    #[test]
    fn missing_folder_is_recorded_not_fatal() {
        let db_dir = TempDir::new().unwrap();
        let library = open_library(&db_dir);
        let outcome =
            scan_folders(&library, &["/definitely/not/a/real/folder".to_string()]).unwrap();
        assert_eq!(outcome.files_found, 0);
        assert_eq!(outcome.files_added, 0);
        assert_eq!(outcome.errors.len(), 1);

        let log = library.get_scan_log(&outcome.log_id).unwrap().unwrap();
        assert_eq!(log.status, ScanStatus::Completed);
        assert_eq!(log.errors.len(), 1);
    }

    #[test]
    fn scan_log_records_counts() {
        let db_dir = TempDir::new().unwrap();
        let music = TempDir::new().unwrap();
        write_file(&music, "A - One.mp3");
        write_file(&music, "A - Two.ogg");

        let library = open_library(&db_dir);
        let outcome = scan_folders(
            &library,
            &[music.path().to_string_lossy().to_string()],
        )
        .unwrap();
        let log = library.get_scan_log(&outcome.log_id).unwrap().unwrap();
        assert_eq!(log.status, ScanStatus::Completed);
        assert_eq!(log.files_found, 2);
        assert_eq!(log.files_added, 2);
        assert!(log.finished_at.is_some());
    }
}
