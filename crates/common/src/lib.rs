use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Single fixed user standing in for every user-scoped operation.
pub const DEFAULT_USER_ID: &str = "default-user";

/// File extensions the scanner accepts, lowercase, without the dot.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "ogg", "m4a", "aac", "wma", "opus", "aiff", "ape", "alac",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub disc_count: u32,
    /// Cached aggregate, reconciled after every scan.
    pub track_count: u32,
    /// Cached aggregate, sum of member track durations in seconds.
    pub duration_secs: u32,
    pub created_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub artist_id: String,
    pub album_id: String,
    pub title: String,
    pub track_no: u32,
    pub disc_no: u32,
    pub duration_secs: u32,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate_hz: Option<u32>,
    /// Lowercase file extension.
    pub format: String,
    pub file_size: u64,
    /// Absolute path; unique across the catalog and used as the dedup key.
    pub file_path: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub lyrics_type: Option<String>,
    pub play_count: u64,
    pub rating: u8,
    pub created_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub user_id: String,
    pub is_public: bool,
    pub is_smart: bool,
    #[serde(default)]
    pub smart_rules: Option<String>,
    /// Ordered membership; a track's position is its index here, which keeps
    /// positions dense and unique through every mutation.
    #[serde(default)]
    pub track_ids: Vec<String>,
    pub track_count: u32,
    pub duration_secs: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: String,
    pub track_id: String,
    pub created_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub user_id: String,
    pub track_id: String,
    pub played_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub position: u32,
    pub track_id: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerBand {
    pub frequency: u32,
    pub gain: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub theme: String,
    pub language: String,
    pub audio_quality: String,
    pub crossfade_secs: u32,
    pub replay_gain: bool,
    pub equalizer_preset: String,
    pub equalizer_bands: Vec<EqualizerBand>,
    pub lyrics_enabled: bool,
    pub gapless_playback: bool,
    pub music_folders: Vec<String>,
}

impl UserSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            theme: "dark".to_string(),
            language: "en".to_string(),
            audio_quality: "high".to_string(),
            crossfade_secs: 0,
            replay_gain: false,
            equalizer_preset: "flat".to_string(),
            equalizer_bands: Vec::new(),
            lyrics_enabled: true,
            gapless_playback: false,
            music_folders: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLog {
    pub id: String,
    /// Scanned folders joined with `;`.
    pub folder_path: String,
    pub status: ScanStatus,
    pub files_found: u32,
    pub files_added: u32,
    pub errors: Vec<String>,
    pub started_at: u64,
    pub finished_at: Option<u64>,
}

/// Deterministic id for scanner-created entities, derived from a stable key
/// such as the absolute file path.
pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

pub fn audio_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    audio_extension(path).is_some()
}

/// Fixed extension-to-MIME mapping for the streaming endpoint. Unrecognized
/// formats fall back to a generic audio type.
pub fn audio_mime(format: &str) -> &'static str {
    match format.trim().to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" | "alac" => "audio/mp4",
        "aac" => "audio/aac",
        "wma" => "audio/x-ms-wma",
        "opus" => "audio/opus",
        "aiff" => "audio/aiff",
        "ape" => "audio/x-ape",
        _ => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{audio_extension, audio_mime, is_audio_file, stable_id};

    #[test]
    fn stable_id_is_deterministic() {
        let first = stable_id("/music/Artist/Album/01 Track.mp3");
        let second = stable_id("/music/Artist/Album/01 Track.mp3");
        assert_eq!(first, second);
        assert_ne!(first, stable_id("/music/Artist/Album/02 Track.mp3"));
    }

    #[test]
    fn audio_extension_is_case_insensitive() {
        assert_eq!(
            audio_extension(Path::new("/music/song.FLAC")),
            Some("flac".to_string())
        );
        assert!(is_audio_file(Path::new("/music/song.Mp3")));
        assert!(!is_audio_file(Path::new("/music/cover.jpg")));
        assert!(!is_audio_file(Path::new("/music/no_extension")));
    }

    #[test]
    fn unknown_format_gets_generic_audio_mime() {
        assert_eq!(audio_mime("flac"), "audio/flac");
        assert_eq!(audio_mime("OGG"), "audio/ogg");
        assert_eq!(audio_mime("xyz"), "audio/mpeg");
    }
}
