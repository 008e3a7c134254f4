mod scan;

pub use scan::{scan_folders, ScanOutcome};

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{
    now_secs, stable_id, Album, Artist, Favorite, HistoryEntry, Playlist, QueueEntry, ScanLog,
    ScanStatus, Track, UserSettings,
};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const KEY_SEP: char = '\x1f';

const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
const ARTISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artists");
const ARTISTS_BY_NAME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artists_by_name");
const ALBUMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("albums");
const ALBUMS_BY_KEY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("albums_by_key");
const TRACKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks");
const TRACKS_BY_PATH_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks_by_path");
const PLAYLISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("playlists");
const FAVORITES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("favorites");
const HISTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("history");
const QUEUE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("queue");
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");
const SCAN_LOG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("scan_log");

const META_HISTORY_SEQ_KEY: &str = "history_seq";

/// The catalog. Cheap to clone; every method opens its own transaction, so a
/// clone can be handed to request handlers and background tasks freely.
#[derive(Clone)]
pub struct Library {
    db: Arc<Database>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryTotals {
    pub total_tracks: usize,
    pub total_albums: usize,
    pub total_artists: usize,
    pub total_playlists: usize,
    pub total_duration: u64,
    pub total_size: u64,
}

/// Partial update for `PATCH /settings`; `None` leaves a field untouched.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub audio_quality: Option<String>,
    pub crossfade_secs: Option<u32>,
    pub replay_gain: Option<bool>,
    pub equalizer_preset: Option<String>,
    pub equalizer_bands: Option<Vec<common::EqualizerBand>>,
    pub lyrics_enabled: Option<bool>,
    pub gapless_playback: Option<bool>,
    pub music_folders: Option<Vec<String>>,
}

impl Library {
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = if path.exists() {
            Database::open(path)?
        } else {
            Database::create(path)?
        };
        let library = Self { db: Arc::new(db) };
        library.init_tables()?;
        Ok(library)
    }

    fn init_tables(&self) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(META_TABLE)?;
            let _ = write_txn.open_table(ARTISTS_TABLE)?;
            let _ = write_txn.open_table(ARTISTS_BY_NAME_TABLE)?;
            let _ = write_txn.open_table(ALBUMS_TABLE)?;
            let _ = write_txn.open_table(ALBUMS_BY_KEY_TABLE)?;
            let _ = write_txn.open_table(TRACKS_TABLE)?;
            let _ = write_txn.open_table(TRACKS_BY_PATH_TABLE)?;
            let _ = write_txn.open_table(PLAYLISTS_TABLE)?;
            let _ = write_txn.open_table(FAVORITES_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(QUEUE_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
            let _ = write_txn.open_table(SCAN_LOG_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ----- artists -----

    pub fn find_or_create_artist(&self, name: &str) -> Result<Artist, LibraryError> {
        let name = name.trim();
        let write_txn = self.db.begin_write()?;
        let artist = {
            let mut by_name = write_txn.open_table(ARTISTS_BY_NAME_TABLE)?;
            let mut artists = write_txn.open_table(ARTISTS_TABLE)?;

            let existing_id = by_name
                .get(name)?
                .map(|value| String::from_utf8_lossy(value.value()).to_string());
            if let Some(id) = existing_id {
                if let Some(value) = artists.get(id.as_str())? {
                    // Nothing written; dropping the transaction aborts it.
                    return Ok(decode_value(value.value())?);
                }
            }

            let artist = Artist {
                id: stable_id(name),
                name: name.to_string(),
                bio: None,
                image_url: None,
                created_at: now_secs(),
            };
            let bytes = encode_value(&artist)?;
            artists.insert(artist.id.as_str(), bytes.as_slice())?;
            by_name.insert(name, artist.id.as_bytes())?;
            artist
        };
        write_txn.commit()?;
        Ok(artist)
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTISTS_TABLE)?;
        let artist = match table.get(artist_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(artist)
    }

    pub fn list_artists(&self) -> Result<Vec<Artist>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTISTS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }

    // ----- albums -----

    pub fn find_or_create_album(
        &self,
        title: &str,
        artist_id: &str,
        year: Option<i32>,
        genre: Option<String>,
    ) -> Result<Album, LibraryError> {
        let key = album_key(title, artist_id);
        let write_txn = self.db.begin_write()?;
        let album = {
            let mut by_key = write_txn.open_table(ALBUMS_BY_KEY_TABLE)?;
            let mut albums = write_txn.open_table(ALBUMS_TABLE)?;

            let existing_id = by_key
                .get(key.as_str())?
                .map(|value| String::from_utf8_lossy(value.value()).to_string());
            if let Some(id) = existing_id {
                if let Some(value) = albums.get(id.as_str())? {
                    return Ok(decode_value(value.value())?);
                }
            }

            let album = Album {
                id: stable_id(&key),
                artist_id: artist_id.to_string(),
                title: title.to_string(),
                year,
                genre,
                cover_url: None,
                disc_count: 1,
                track_count: 0,
                duration_secs: 0,
                created_at: now_secs(),
            };
            let bytes = encode_value(&album)?;
            albums.insert(album.id.as_str(), bytes.as_slice())?;
            by_key.insert(key.as_str(), album.id.as_bytes())?;
            album
        };
        write_txn.commit()?;
        Ok(album)
    }

    pub fn get_album(&self, album_id: &str) -> Result<Option<Album>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALBUMS_TABLE)?;
        let album = match table.get(album_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(album)
    }

    pub fn list_albums(&self) -> Result<Vec<Album>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALBUMS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }

    /// Member tracks in album order (disc, then track number, then title).
    pub fn get_album_tracks(&self, album_id: &str) -> Result<Vec<Track>, LibraryError> {
        let mut tracks: Vec<Track> = self
            .list_tracks()?
            .into_iter()
            .filter(|track| track.album_id == album_id)
            .collect();
        tracks.sort_by(|a, b| {
            a.disc_no
                .cmp(&b.disc_no)
                .then_with(|| a.track_no.cmp(&b.track_no))
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
        Ok(tracks)
    }

    /// Recomputes cached `track_count` and `duration_secs` for every album by
    /// summing member tracks. Intentionally a full pass over the catalog.
    pub fn recompute_album_aggregates(&self) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut albums = write_txn.open_table(ALBUMS_TABLE)?;
            let tracks = write_txn.open_table(TRACKS_TABLE)?;

            let mut per_album: HashMap<String, (u32, u32, u32)> = HashMap::new();
            for entry in tracks.iter()? {
                let entry = entry?;
                let track: Track = decode_value(entry.1.value())?;
                let slot = per_album.entry(track.album_id).or_insert((0, 0, 1));
                slot.0 += 1;
                slot.1 = slot.1.saturating_add(track.duration_secs);
                slot.2 = slot.2.max(track.disc_no);
            }

            let mut updated = Vec::new();
            for entry in albums.iter()? {
                let entry = entry?;
                let mut album: Album = decode_value(entry.1.value())?;
                let (count, duration, discs) = per_album
                    .get(&album.id)
                    .copied()
                    .unwrap_or((0, 0, 1));
                if album.track_count != count
                    || album.duration_secs != duration
                    || album.disc_count != discs
                {
                    album.track_count = count;
                    album.duration_secs = duration;
                    album.disc_count = discs;
                    updated.push(album);
                }
            }
            for album in updated {
                let bytes = encode_value(&album)?;
                albums.insert(album.id.as_str(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // ----- tracks -----

    /// First write wins: returns `false` without touching the catalog when a
    /// track with the same file path already exists.
    pub fn insert_track(&self, track: Track) -> Result<bool, LibraryError> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut by_path = write_txn.open_table(TRACKS_BY_PATH_TABLE)?;
            let mut tracks = write_txn.open_table(TRACKS_TABLE)?;
            let known = by_path.get(track.file_path.as_str())?.is_some();
            if known {
                false
            } else {
                let bytes = encode_value(&track)?;
                tracks.insert(track.id.as_str(), bytes.as_slice())?;
                by_path.insert(track.file_path.as_str(), track.id.as_bytes())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    pub fn get_track(&self, track_id: &str) -> Result<Option<Track>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRACKS_TABLE)?;
        let track = match table.get(track_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(track)
    }

    pub fn get_track_by_path(&self, file_path: &str) -> Result<Option<Track>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let by_path = read_txn.open_table(TRACKS_BY_PATH_TABLE)?;
        let track_id = match by_path.get(file_path)? {
            Some(value) => String::from_utf8_lossy(value.value()).to_string(),
            None => return Ok(None),
        };
        let tracks = read_txn.open_table(TRACKS_TABLE)?;
        let track = match tracks.get(track_id.as_str())? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(track)
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRACKS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }

    pub fn set_track_rating(&self, track_id: &str, rating: u8) -> Result<Option<Track>, LibraryError> {
        self.update_track(track_id, |track| track.rating = rating.min(5))
    }

    pub fn set_track_lyrics(
        &self,
        track_id: &str,
        lyrics: Option<String>,
        lyrics_type: Option<String>,
    ) -> Result<Option<Track>, LibraryError> {
        self.update_track(track_id, |track| {
            track.lyrics = lyrics.clone().filter(|value| !value.is_empty());
            track.lyrics_type = if track.lyrics.is_some() {
                lyrics_type.clone()
            } else {
                None
            };
        })
    }

    /// The increment runs read-modify-write inside one write transaction;
    /// redb serializes writers, so concurrent range requests cannot lose
    /// updates.
    pub fn increment_play_count(&self, track_id: &str) -> Result<(), LibraryError> {
        self.update_track(track_id, |track| {
            track.play_count = track.play_count.saturating_add(1)
        })?;
        Ok(())
    }

    fn update_track<F>(&self, track_id: &str, mut apply: F) -> Result<Option<Track>, LibraryError>
    where
        F: FnMut(&mut Track),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut tracks = write_txn.open_table(TRACKS_TABLE)?;
            let mut track: Track = match tracks.get(track_id)? {
                Some(value) => decode_value(value.value())?,
                None => return Ok(None),
            };
            apply(&mut track);
            let bytes = encode_value(&track)?;
            tracks.insert(track_id, bytes.as_slice())?;
            track
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    // ----- playlists -----

    pub fn create_playlist(
        &self,
        name: String,
        description: Option<String>,
        user_id: String,
        is_public: bool,
        is_smart: bool,
        smart_rules: Option<String>,
    ) -> Result<Playlist, LibraryError> {
        let now = now_secs();
        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            cover_url: None,
            user_id,
            is_public,
            is_smart,
            smart_rules,
            track_ids: Vec::new(),
            track_count: 0,
            duration_secs: 0,
            created_at: now,
            updated_at: now,
        };
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PLAYLISTS_TABLE)?;
            let bytes = encode_value(&playlist)?;
            table.insert(playlist.id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(playlist)
    }

    pub fn list_playlists(&self) -> Result<Vec<Playlist>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PLAYLISTS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }

    pub fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PLAYLISTS_TABLE)?;
        let playlist = match table.get(playlist_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(playlist)
    }

    pub fn update_playlist_meta(
        &self,
        playlist_id: &str,
        name: Option<String>,
        description: Option<String>,
        is_public: Option<bool>,
        cover_url: Option<String>,
    ) -> Result<Option<Playlist>, LibraryError> {
        self.update_playlist(playlist_id, |playlist| {
            if let Some(name) = name.clone() {
                playlist.name = name;
            }
            if let Some(description) = description.clone() {
                playlist.description = Some(description);
            }
            if let Some(is_public) = is_public {
                playlist.is_public = is_public;
            }
            if let Some(cover_url) = cover_url.clone() {
                playlist.cover_url = Some(cover_url);
            }
        })
    }

    pub fn delete_playlist(&self, playlist_id: &str) -> Result<bool, LibraryError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(PLAYLISTS_TABLE)?;
            let removed = table.remove(playlist_id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Appends after the current maximum position; track ids already present
    /// in the playlist are silently rejected. Returns the number actually
    /// added, or `None` for an unknown playlist.
    pub fn add_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<Option<usize>, LibraryError> {
        let mut added = 0usize;
        let updated = self.update_playlist(playlist_id, |playlist| {
            added = 0;
            for track_id in track_ids {
                if playlist.track_ids.iter().any(|id| id == track_id) {
                    continue;
                }
                playlist.track_ids.push(track_id.clone());
                added += 1;
            }
        })?;
        Ok(updated.map(|_| added))
    }

    pub fn remove_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<Option<Playlist>, LibraryError> {
        self.update_playlist(playlist_id, |playlist| {
            playlist
                .track_ids
                .retain(|id| !track_ids.iter().any(|removed| removed == id));
        })
    }

    /// Rebuilds the membership order from (track id, position) pairs. Ids not
    /// mentioned keep their relative order after the reordered block, so the
    /// result is always dense and 0-based.
    pub fn reorder_playlist_tracks(
        &self,
        playlist_id: &str,
        order: &[(String, u32)],
    ) -> Result<Option<Playlist>, LibraryError> {
        self.update_playlist(playlist_id, |playlist| {
            let mut pairs: Vec<(String, u32)> = order
                .iter()
                .filter(|(track_id, _)| playlist.track_ids.iter().any(|id| id == track_id))
                .cloned()
                .collect();
            pairs.sort_by_key(|(_, position)| *position);

            let mut reordered: Vec<String> = pairs.into_iter().map(|(id, _)| id).collect();
            for track_id in &playlist.track_ids {
                if !reordered.iter().any(|id| id == track_id) {
                    reordered.push(track_id.clone());
                }
            }
            playlist.track_ids = reordered;
        })
    }

    fn update_playlist<F>(
        &self,
        playlist_id: &str,
        mut apply: F,
    ) -> Result<Option<Playlist>, LibraryError>
    where
        F: FnMut(&mut Playlist),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut playlists = write_txn.open_table(PLAYLISTS_TABLE)?;
            let tracks = write_txn.open_table(TRACKS_TABLE)?;
            let mut playlist: Playlist = match playlists.get(playlist_id)? {
                Some(value) => decode_value(value.value())?,
                None => return Ok(None),
            };
            apply(&mut playlist);

            // Membership aggregates are recomputed on every mutation.
            playlist.track_count = playlist.track_ids.len() as u32;
            let mut duration = 0u32;
            for track_id in &playlist.track_ids {
                if let Some(value) = tracks.get(track_id.as_str())? {
                    let track: Track = decode_value(value.value())?;
                    duration = duration.saturating_add(track.duration_secs);
                }
            }
            playlist.duration_secs = duration;
            playlist.updated_at = now_secs();

            let bytes = encode_value(&playlist)?;
            playlists.insert(playlist_id, bytes.as_slice())?;
            playlist
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    // ----- favorites -----

    /// Existence is the favorited state; returns the state after the toggle.
    pub fn toggle_favorite(&self, user_id: &str, track_id: &str) -> Result<bool, LibraryError> {
        let key = pair_key(user_id, track_id);
        let write_txn = self.db.begin_write()?;
        let favorited = {
            let mut table = write_txn.open_table(FAVORITES_TABLE)?;
            let removed = table.remove(key.as_str())?.is_some();
            if removed {
                false
            } else {
                let favorite = Favorite {
                    user_id: user_id.to_string(),
                    track_id: track_id.to_string(),
                    created_at: now_secs(),
                };
                let bytes = encode_value(&favorite)?;
                table.insert(key.as_str(), bytes.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(favorited)
    }

    pub fn remove_favorite(&self, user_id: &str, track_id: &str) -> Result<bool, LibraryError> {
        let key = pair_key(user_id, track_id);
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(FAVORITES_TABLE)?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn is_favorite(&self, user_id: &str, track_id: &str) -> Result<bool, LibraryError> {
        let key = pair_key(user_id, track_id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FAVORITES_TABLE)?;
        let favorited = table.get(key.as_str())?.is_some();
        Ok(favorited)
    }

    /// Most recently favorited first.
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FAVORITES_TABLE)?;
        let (start, end) = prefix_bounds(user_id);
        let mut items: Vec<Favorite> = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    // ----- history -----

    /// Append-only; repeats are allowed.
    pub fn add_history(&self, user_id: &str, track_id: &str) -> Result<HistoryEntry, LibraryError> {
        let entry = HistoryEntry {
            user_id: user_id.to_string(),
            track_id: track_id.to_string(),
            played_at: now_secs(),
        };
        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META_TABLE)?;
            let seq: u64 = match meta.get(META_HISTORY_SEQ_KEY)? {
                Some(value) => decode_value(value.value())?,
                None => 0,
            };
            let next = seq + 1;
            let seq_bytes = encode_value(&next)?;
            meta.insert(META_HISTORY_SEQ_KEY, seq_bytes.as_slice())?;

            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            let key = history_key(user_id, next);
            let bytes = encode_value(&entry)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(entry)
    }

    /// Newest first.
    pub fn list_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;
        let (start, end) = prefix_bounds(user_id);
        let mut items: Vec<HistoryEntry> = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        items.reverse();
        Ok(items)
    }

    pub fn clear_history(&self, user_id: &str) -> Result<usize, LibraryError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            let (start, end) = prefix_bounds(user_id);
            let keys: Vec<String> = {
                let mut keys = Vec::new();
                for entry in table.range(start.as_str()..end.as_str())? {
                    let entry = entry?;
                    keys.push(entry.0.value().to_string());
                }
                keys
            };
            for key in &keys {
                table.remove(key.as_str())?;
            }
            keys.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    // ----- persisted queue -----

    /// The stored queue is replaced wholesale, never merged.
    pub fn set_queue(&self, track_ids: &[String], source: &str) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(QUEUE_TABLE)?;
            let keys: Vec<String> = {
                let mut keys = Vec::new();
                for entry in table.iter()? {
                    let entry = entry?;
                    keys.push(entry.0.value().to_string());
                }
                keys
            };
            for key in &keys {
                table.remove(key.as_str())?;
            }
            for (position, track_id) in track_ids.iter().enumerate() {
                let entry = QueueEntry {
                    position: position as u32,
                    track_id: track_id.clone(),
                    source: source.to_string(),
                };
                let key = format!("{:08}", position);
                let bytes = encode_value(&entry)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_queue(&self) -> Result<Vec<QueueEntry>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(QUEUE_TABLE)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }

    pub fn clear_queue(&self) -> Result<(), LibraryError> {
        self.set_queue(&[], "manual")
    }

    // ----- settings -----

    pub fn get_or_create_settings(&self, user_id: &str) -> Result<UserSettings, LibraryError> {
        if let Some(settings) = self.get_settings(user_id)? {
            return Ok(settings);
        }
        let settings = UserSettings::defaults_for(user_id);
        self.put_settings(&settings)?;
        Ok(settings)
    }

    pub fn update_settings(
        &self,
        user_id: &str,
        patch: &SettingsPatch,
    ) -> Result<UserSettings, LibraryError> {
        let mut settings = self.get_or_create_settings(user_id)?;
        if let Some(theme) = &patch.theme {
            settings.theme = theme.clone();
        }
        if let Some(language) = &patch.language {
            settings.language = language.clone();
        }
        if let Some(audio_quality) = &patch.audio_quality {
            settings.audio_quality = audio_quality.clone();
        }
        if let Some(crossfade_secs) = patch.crossfade_secs {
            settings.crossfade_secs = crossfade_secs;
        }
        if let Some(replay_gain) = patch.replay_gain {
            settings.replay_gain = replay_gain;
        }
        if let Some(equalizer_preset) = &patch.equalizer_preset {
            settings.equalizer_preset = equalizer_preset.clone();
        }
        if let Some(equalizer_bands) = &patch.equalizer_bands {
            settings.equalizer_bands = equalizer_bands.clone();
        }
        if let Some(lyrics_enabled) = patch.lyrics_enabled {
            settings.lyrics_enabled = lyrics_enabled;
        }
        if let Some(gapless_playback) = patch.gapless_playback {
            settings.gapless_playback = gapless_playback;
        }
        if let Some(music_folders) = &patch.music_folders {
            settings.music_folders = music_folders.clone();
        }
        self.put_settings(&settings)?;
        Ok(settings)
    }

    fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        let settings = match table.get(user_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(settings)
    }

    fn put_settings(&self, settings: &UserSettings) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SETTINGS_TABLE)?;
            let bytes = encode_value(settings)?;
            table.insert(settings.user_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ----- scan audit log -----

    pub fn create_scan_log(&self, folders: &[String]) -> Result<ScanLog, LibraryError> {
        let log = ScanLog {
            id: Uuid::new_v4().to_string(),
            folder_path: folders.join(";"),
            status: ScanStatus::Scanning,
            files_found: 0,
            files_added: 0,
            errors: Vec::new(),
            started_at: now_secs(),
            finished_at: None,
        };
        self.put_scan_log(&log)?;
        Ok(log)
    }

    pub fn finish_scan_log(
        &self,
        log_id: &str,
        status: ScanStatus,
        files_found: u32,
        files_added: u32,
        errors: &[String],
    ) -> Result<(), LibraryError> {
        let Some(mut log) = self.get_scan_log(log_id)? else {
            return Ok(());
        };
        log.status = status;
        log.files_found = files_found;
        log.files_added = files_added;
        log.errors = errors.to_vec();
        log.finished_at = Some(now_secs());
        self.put_scan_log(&log)
    }

    pub fn get_scan_log(&self, log_id: &str) -> Result<Option<ScanLog>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SCAN_LOG_TABLE)?;
        let log = match table.get(log_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(log)
    }

    fn put_scan_log(&self, log: &ScanLog) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SCAN_LOG_TABLE)?;
            let bytes = encode_value(log)?;
            table.insert(log.id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ----- aggregates -----

    pub fn totals(&self) -> Result<LibraryTotals, LibraryError> {
        let tracks = self.list_tracks()?;
        let total_duration: u64 = tracks.iter().map(|t| u64::from(t.duration_secs)).sum();
        let total_size: u64 = tracks.iter().map(|t| t.file_size).sum();
        Ok(LibraryTotals {
            total_tracks: tracks.len(),
            total_albums: self.list_albums()?.len(),
            total_artists: self.list_artists()?.len(),
            total_playlists: self.list_playlists()?.len(),
            total_duration,
            total_size,
        })
    }

    /// Genre name to track count, most common first.
    pub fn genre_counts(&self) -> Result<Vec<(String, usize)>, LibraryError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for track in self.list_tracks()? {
            if let Some(genre) = track.genre {
                if !genre.trim().is_empty() {
                    *counts.entry(genre).or_insert(0) += 1;
                }
            }
        }
        let mut items: Vec<(String, usize)> = counts.into_iter().collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(items)
    }
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Redb(err) => write!(f, "db error: {}", err),
            LibraryError::Bincode(err) => write!(f, "encode error: {}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<redb::Error> for LibraryError {
    fn from(err: redb::Error) -> Self {
        LibraryError::Redb(err)
    }
}

impl From<DatabaseError> for LibraryError {
    fn from(err: DatabaseError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TableError> for LibraryError {
    fn from(err: TableError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TransactionError> for LibraryError {
    fn from(err: TransactionError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<StorageError> for LibraryError {
    fn from(err: StorageError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<CommitError> for LibraryError {
    fn from(err: CommitError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for LibraryError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        LibraryError::Bincode(err)
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, LibraryError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LibraryError> {
    Ok(bincode::deserialize(bytes)?)
}

fn pair_key(left: &str, right: &str) -> String {
    let mut out = String::with_capacity(left.len() + right.len() + 1);
    out.push_str(left);
    out.push(KEY_SEP);
    out.push_str(right);
    out
}

fn album_key(title: &str, artist_id: &str) -> String {
    pair_key(title, artist_id)
}

fn history_key(user_id: &str, seq: u64) -> String {
    let mut out = String::new();
    out.push_str(user_id);
    out.push(KEY_SEP);
    out.push_str(&format!("{:020}", seq));
    out
}

fn prefix_bounds(prefix: &str) -> (String, String) {
    let mut start = String::with_capacity(prefix.len() + 1);
    start.push_str(prefix);
    start.push(KEY_SEP);
    let mut end = start.clone();
    end.push('\u{10ffff}');
    (start, end)
}

#[cfg(test)]
mod tests {
    use common::{now_secs, stable_id, ScanStatus, Track, DEFAULT_USER_ID};
    use tempfile::TempDir;

    use super::{Library, SettingsPatch};

    pub(crate) fn open_library(dir: &TempDir) -> Library {
        Library::open(&dir.path().join("catalog.redb")).unwrap()
    }

    pub(crate) fn sample_track(library: &Library, title: &str, duration_secs: u32) -> Track {
        let artist = library.find_or_create_artist("Sample Artist").unwrap();
        let album = library
            .find_or_create_album("Sample Album", &artist.id, Some(2001), None)
            .unwrap();
        let file_path = format!("/music/Sample Artist/Sample Album/{}.mp3", title);
        let track = Track {
            id: stable_id(&file_path),
            artist_id: artist.id,
            album_id: album.id,
            title: title.to_string(),
            track_no: 1,
            disc_no: 1,
            duration_secs,
            bitrate_kbps: Some(320),
            sample_rate_hz: Some(44_100),
            format: "mp3".to_string(),
            file_size: 1024,
            file_path,
            genre: Some("Rock".to_string()),
            year: Some(2001),
            lyrics: None,
            lyrics_type: None,
            play_count: 0,
            rating: 0,
            created_at: now_secs(),
        };
        assert!(library.insert_track(track.clone()).unwrap());
        track
    }

    #[test]
    fn find_or_create_artist_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let first = library.find_or_create_artist("Can").unwrap();
        let second = library.find_or_create_artist("Can").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(library.list_artists().unwrap().len(), 1);
    }

    #[test]
    fn album_lookup_matches_exact_title_and_artist() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let neu = library.find_or_create_artist("Neu!").unwrap();
        let faust = library.find_or_create_artist("Faust").unwrap();
        let a = library
            .find_or_create_album("IV", &neu.id, Some(1973), None)
            .unwrap();
        let b = library
            .find_or_create_album("IV", &neu.id, None, None)
            .unwrap();
        let c = library
            .find_or_create_album("IV", &faust.id, Some(1973), None)
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        // First write wins for album attributes too.
        assert_eq!(b.year, Some(1973));
    }

    #[test]
    fn duplicate_file_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let track = sample_track(&library, "One", 100);
        let mut dupe = track.clone();
        dupe.title = "Renamed".to_string();
        assert!(!library.insert_track(dupe).unwrap());
        let stored = library.get_track_by_path(&track.file_path).unwrap().unwrap();
        assert_eq!(stored.title, "One");
    }

    #[test]
    fn play_count_increments_monotonically() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let track = sample_track(&library, "Counter", 10);
        for _ in 0..3 {
            library.increment_play_count(&track.id).unwrap();
        }
        assert_eq!(library.get_track(&track.id).unwrap().unwrap().play_count, 3);
    }

    #[test]
    fn album_aggregates_reconcile_with_member_tracks() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let a = sample_track(&library, "A", 120);
        let _b = sample_track(&library, "B", 80);
        library.recompute_album_aggregates().unwrap();
        let album = library.get_album(&a.album_id).unwrap().unwrap();
        assert_eq!(album.track_count, 2);
        assert_eq!(album.duration_secs, 200);
    }

    #[test]
    fn playlist_membership_stays_dense_and_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let a = sample_track(&library, "A", 60);
        let b = sample_track(&library, "B", 60);
        let c = sample_track(&library, "C", 60);
        let playlist = library
            .create_playlist(
                "Mix".to_string(),
                None,
                DEFAULT_USER_ID.to_string(),
                false,
                false,
                None,
            )
            .unwrap();

        let added = library
            .add_playlist_tracks(&playlist.id, &[a.id.clone(), b.id.clone(), a.id.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(added, 2);

        // Append lands after the current maximum position.
        library
            .add_playlist_tracks(&playlist.id, &[c.id.clone()])
            .unwrap();
        let stored = library.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(stored.track_ids, vec![a.id.clone(), b.id.clone(), c.id.clone()]);
        assert_eq!(stored.track_count, 3);
        assert_eq!(stored.duration_secs, 180);

        library
            .reorder_playlist_tracks(
                &playlist.id,
                &[(c.id.clone(), 0), (a.id.clone(), 1), (b.id.clone(), 2)],
            )
            .unwrap();
        let stored = library.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(stored.track_ids, vec![c.id.clone(), a.id.clone(), b.id.clone()]);

        library
            .remove_playlist_tracks(&playlist.id, &[a.id.clone()])
            .unwrap();
        let stored = library.get_playlist(&playlist.id).unwrap().unwrap();
        assert_eq!(stored.track_ids, vec![c.id, b.id]);
        assert_eq!(stored.track_count, 2);
        assert_eq!(stored.duration_secs, 120);
    }

    #[test]
    fn favorite_toggles_by_existence() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let track = sample_track(&library, "Fav", 10);
        assert!(library.toggle_favorite(DEFAULT_USER_ID, &track.id).unwrap());
        assert!(library.is_favorite(DEFAULT_USER_ID, &track.id).unwrap());
        assert!(!library.toggle_favorite(DEFAULT_USER_ID, &track.id).unwrap());
        assert!(!library.is_favorite(DEFAULT_USER_ID, &track.id).unwrap());
        assert!(library.list_favorites(DEFAULT_USER_ID).unwrap().is_empty());
    }

    #[test]
    fn history_keeps_repeats_and_clears_per_user() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let track = sample_track(&library, "Loop", 10);
        library.add_history(DEFAULT_USER_ID, &track.id).unwrap();
        library.add_history(DEFAULT_USER_ID, &track.id).unwrap();
        library.add_history("someone-else", &track.id).unwrap();

        assert_eq!(library.list_history(DEFAULT_USER_ID).unwrap().len(), 2);
        assert_eq!(library.clear_history(DEFAULT_USER_ID).unwrap(), 2);
        assert!(library.list_history(DEFAULT_USER_ID).unwrap().is_empty());
        assert_eq!(library.list_history("someone-else").unwrap().len(), 1);
    }

    #[test]
    fn persisted_queue_is_replaced_wholesale() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let a = sample_track(&library, "A", 10);
        let b = sample_track(&library, "B", 10);

        library
            .set_queue(&[a.id.clone(), b.id.clone()], "library")
            .unwrap();
        let queue = library.get_queue().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].position, 0);
        assert_eq!(queue[0].track_id, a.id);
        assert_eq!(queue[1].position, 1);

        library.set_queue(&[b.id.clone()], "manual").unwrap();
        let queue = library.get_queue().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].track_id, b.id);
        assert_eq!(queue[0].source, "manual");

        library.clear_queue().unwrap();
        assert!(library.get_queue().unwrap().is_empty());
    }

    #[test]
    fn settings_created_with_defaults_and_patched() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let settings = library.get_or_create_settings(DEFAULT_USER_ID).unwrap();
        assert_eq!(settings.theme, "dark");
        assert!(settings.music_folders.is_empty());

        let patch = SettingsPatch {
            theme: Some("light".to_string()),
            music_folders: Some(vec!["/music".to_string()]),
            ..SettingsPatch::default()
        };
        let updated = library.update_settings(DEFAULT_USER_ID, &patch).unwrap();
        assert_eq!(updated.theme, "light");
        assert_eq!(updated.music_folders, vec!["/music".to_string()]);
        // Untouched fields keep their previous values.
        assert_eq!(updated.language, "en");
    }

    #[test]
    fn scan_log_lifecycle_reaches_completed() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        let log = library
            .create_scan_log(&["/music".to_string(), "/more".to_string()])
            .unwrap();
        assert_eq!(log.status, ScanStatus::Scanning);
        assert_eq!(log.folder_path, "/music;/more");

        library
            .finish_scan_log(&log.id, ScanStatus::Completed, 10, 4, &["bad file".to_string()])
            .unwrap();
        let stored = library.get_scan_log(&log.id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert_eq!(stored.files_found, 10);
        assert_eq!(stored.files_added, 4);
        assert_eq!(stored.errors, vec!["bad file".to_string()]);
        assert!(stored.finished_at.is_some());
    }

    #[test]
    fn totals_and_genres_reflect_catalog() {
        let dir = TempDir::new().unwrap();
        let library = open_library(&dir);
        sample_track(&library, "A", 100);
        sample_track(&library, "B", 50);
        let totals = library.totals().unwrap();
        assert_eq!(totals.total_tracks, 2);
        assert_eq!(totals.total_albums, 1);
        assert_eq!(totals.total_artists, 1);
        assert_eq!(totals.total_duration, 150);
        assert_eq!(totals.total_size, 2048);

        let genres = library.genre_counts().unwrap();
        assert_eq!(genres, vec![("Rock".to_string(), 2)]);
    }
}
