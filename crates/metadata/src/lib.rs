use std::path::Path;

use lofty::error::LoftyError;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Raw tag fields as read from the file, before fallbacks are applied.
#[derive(Debug, Default, Clone)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_no: Option<u32>,
    pub disc_no: Option<u32>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub duration_secs: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate_hz: Option<u32>,
}

/// Canonical metadata for one file: every field populated, tag values
/// overriding filename-derived fallbacks field by field.
#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track_no: u32,
    pub disc_no: u32,
    pub duration_secs: u32,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate_hz: Option<u32>,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime: Option<String>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Resolves canonical metadata for an audio file. Tag extraction failure is
/// non-fatal: the filename-derived fallback is kept and nothing is surfaced.
pub fn resolve(path: &Path) -> TrackMetadata {
    let (fallback_artist, fallback_title) = split_artist_title(&file_stem(path));
    let tag = read_tags(path).unwrap_or_default();

    TrackMetadata {
        title: tag.title.unwrap_or(fallback_title),
        artist: tag.artist.unwrap_or(fallback_artist),
        album: tag.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        track_no: normalize_number(tag.track_no),
        disc_no: normalize_number(tag.disc_no),
        duration_secs: tag.duration_secs.unwrap_or(0),
        bitrate_kbps: tag.bitrate_kbps,
        sample_rate_hz: tag.sample_rate_hz,
        genre: tag.genre,
        year: tag.year,
    }
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut info = TagInfo::default();

    let duration_ms = properties.duration().as_millis();
    if duration_ms > 0 {
        let clamped = duration_ms.min(u128::from(u64::MAX)) as u64;
        info.duration_secs = Some(round_ms_to_secs(clamped));
    }

    info.sample_rate_hz = properties.sample_rate();
    // lofty reports bitrate in kbps.
    info.bitrate_kbps = properties.audio_bitrate().or(properties.overall_bitrate());

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        info.title = non_empty(tag.get_string(&ItemKey::TrackTitle));
        info.artist = non_empty(tag.get_string(&ItemKey::TrackArtist))
            .or_else(|| non_empty(tag.get_string(&ItemKey::AlbumArtist)));
        info.album = non_empty(tag.get_string(&ItemKey::AlbumTitle));
        info.track_no = tag.get_string(&ItemKey::TrackNumber).and_then(parse_number);
        info.disc_no = tag.get_string(&ItemKey::DiscNumber).and_then(parse_number);
        info.year = tag.get_string(&ItemKey::Year).and_then(parse_year);
        info.genre = non_empty(tag.get_string(&ItemKey::Genre)).map(first_genre);
    }

    Ok(info)
}

/// Front cover if tagged as such, otherwise the first embedded picture.
pub fn read_cover(path: &Path) -> Result<Option<CoverArt>, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => return Ok(None),
    };

    let picture = match pick_picture(tag.pictures()) {
        Some(picture) => picture,
        None => return Ok(None),
    };

    let data = picture.data().to_vec();
    let mime = guess_image_mime(&data);
    Ok(Some(CoverArt { data, mime }))
}

/// Splits a filename stem on the first `" - "`: left part becomes the artist
/// and right part the title. Without a separator the whole stem is the title.
pub fn split_artist_title(stem: &str) -> (String, String) {
    match stem.find(" - ") {
        Some(idx) if idx > 0 => {
            let artist = stem[..idx].trim();
            let title = stem[idx + 3..].trim();
            if artist.is_empty() || title.is_empty() {
                (UNKNOWN_ARTIST.to_string(), stem.trim().to_string())
            } else {
                (artist.to_string(), title.to_string())
            }
        }
        _ => (UNKNOWN_ARTIST.to_string(), stem.trim().to_string()),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn round_ms_to_secs(ms: u64) -> u32 {
    let secs = (ms + 500) / 1000;
    secs.min(u64::from(u32::MAX)) as u32
}

/// Track and disc numbers default to 1 when absent or non-positive.
fn normalize_number(value: Option<u32>) -> u32 {
    match value {
        Some(n) if n > 0 => n,
        _ => 1,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn parse_number(text: &str) -> Option<u32> {
    // Handles "3" as well as "3/12".
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok()
}

fn parse_year(text: &str) -> Option<i32> {
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            if digits.len() == 4 {
                break;
            }
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn first_genre(text: String) -> String {
    text.split(&[';', ',', '/', '\0'][..])
        .map(|part| part.trim())
        .find(|part| !part.is_empty())
        .unwrap_or("")
        .to_string()
}

fn pick_picture(pictures: &[Picture]) -> Option<&Picture> {
    for picture in pictures {
        if picture.pic_type() == PictureType::CoverFront {
            return Some(picture);
        }
    }
    pictures.first()
}

fn guess_image_mime(bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg".to_string())
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        normalize_number, parse_number, parse_year, resolve, round_ms_to_secs, split_artist_title,
        UNKNOWN_ARTIST,
    };

    #[test]
    fn splits_artist_and_title_on_first_separator() {
        let (artist, title) = split_artist_title("Morphine - Cure for Pain");
        assert_eq!(artist, "Morphine");
        assert_eq!(title, "Cure for Pain");

        // Only the first separator splits; the rest stays in the title.
        let (artist, title) = split_artist_title("A - B - C");
        assert_eq!(artist, "A");
        assert_eq!(title, "B - C");
    }

    #[test]
    fn whole_stem_becomes_title_without_separator() {
        let (artist, title) = split_artist_title("Interlude");
        assert_eq!(artist, UNKNOWN_ARTIST);
        assert_eq!(title, "Interlude");
    }

    #[test]
    fn resolve_falls_back_to_filename_when_tags_unreadable() {
        // Path does not exist, so tag extraction fails and only the filename
        // fallback remains.
        let meta = resolve(Path::new("/nowhere/Big Star - Thirteen.mp3"));
        assert_eq!(meta.artist, "Big Star");
        assert_eq!(meta.title, "Thirteen");
        assert_eq!(meta.album, "Unknown Album");
        assert_eq!(meta.track_no, 1);
        assert_eq!(meta.disc_no, 1);
        assert_eq!(meta.duration_secs, 0);
        assert!(meta.bitrate_kbps.is_none());
    }

    #[test]
    fn track_numbers_handle_totals_and_default_to_one() {
        assert_eq!(parse_number("7/12"), Some(7));
        assert_eq!(parse_number(" 3 "), Some(3));
        assert_eq!(parse_number("x"), None);
        assert_eq!(normalize_number(Some(0)), 1);
        assert_eq!(normalize_number(None), 1);
        assert_eq!(normalize_number(Some(9)), 9);
    }

    #[test]
    fn year_parses_first_four_digit_run() {
        assert_eq!(parse_year("1997"), Some(1997));
        assert_eq!(parse_year("1997-05-01"), Some(1997));
        assert_eq!(parse_year("circa 2003"), Some(2003));
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn duration_rounds_to_nearest_second() {
        assert_eq!(round_ms_to_secs(1499), 1);
        assert_eq!(round_ms_to_secs(1500), 2);
        assert_eq!(round_ms_to_secs(0), 0);
    }
}
