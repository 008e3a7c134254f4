use std::collections::HashMap;

use common::{Album, Artist, Playlist, Track};
use library::{Library, LibraryError};
use serde::Serialize;

use crate::utils::rfc3339;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub album_id: String,
    pub album_title: String,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration: u32,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub format: String,
    pub size: u64,
    pub file_path: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub lyrics: Option<String>,
    pub lyrics_type: Option<String>,
    pub play_count: u64,
    pub rating: u8,
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorited_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AlbumView {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub disc_count: u32,
    pub track_count: u32,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<TrackView>>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArtistView {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub album_count: usize,
    pub track_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albums: Option<Vec<AlbumView>>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub user_id: String,
    pub is_public: bool,
    pub is_smart: bool,
    pub track_count: u32,
    pub duration: u32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<TrackView>>,
}

/// Artist and album display names resolved once per request instead of per
/// track.
pub struct NameIndex {
    artists: HashMap<String, String>,
    albums: HashMap<String, (String, Option<String>)>,
}

impl NameIndex {
    pub fn load(library: &Library) -> Result<Self, LibraryError> {
        let artists = library
            .list_artists()?
            .into_iter()
            .map(|artist| (artist.id, artist.name))
            .collect();
        let albums = library
            .list_albums()?
            .into_iter()
            .map(|album| (album.id, (album.title, album.cover_url)))
            .collect();
        Ok(Self { artists, albums })
    }

    pub fn artist_name(&self, artist_id: &str) -> String {
        self.artists
            .get(artist_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
    }

    pub fn album_title(&self, album_id: &str) -> String {
        self.albums
            .get(album_id)
            .map(|(title, _)| title.clone())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
    }

    pub fn album_cover(&self, album_id: &str) -> Option<String> {
        self.albums
            .get(album_id)
            .and_then(|(_, cover)| cover.clone())
    }
}

pub fn track_view(track: &Track, names: &NameIndex) -> TrackView {
    TrackView {
        id: track.id.clone(),
        title: track.title.clone(),
        artist_id: track.artist_id.clone(),
        artist_name: names.artist_name(&track.artist_id),
        album_id: track.album_id.clone(),
        album_title: names.album_title(&track.album_id),
        track_number: track.track_no,
        disc_number: track.disc_no,
        duration: track.duration_secs,
        bitrate: track.bitrate_kbps,
        sample_rate: track.sample_rate_hz,
        format: track.format.clone(),
        size: track.file_size,
        file_path: track.file_path.clone(),
        genre: track.genre.clone(),
        year: track.year,
        lyrics: track.lyrics.clone(),
        lyrics_type: track.lyrics_type.clone(),
        play_count: track.play_count,
        rating: track.rating,
        cover_url: names.album_cover(&track.album_id),
        is_favorite: None,
        favorited_at: None,
        played_at: None,
    }
}

pub fn album_view(album: &Album, names: &NameIndex) -> AlbumView {
    AlbumView {
        id: album.id.clone(),
        title: album.title.clone(),
        artist_id: album.artist_id.clone(),
        artist_name: names.artist_name(&album.artist_id),
        year: album.year,
        genre: album.genre.clone(),
        cover_url: album.cover_url.clone(),
        disc_count: album.disc_count,
        track_count: album.track_count,
        duration: album.duration_secs,
        tracks: None,
    }
}

pub fn artist_view(artist: &Artist, album_count: usize, track_count: usize) -> ArtistView {
    ArtistView {
        id: artist.id.clone(),
        name: artist.name.clone(),
        bio: artist.bio.clone(),
        image_url: artist.image_url.clone(),
        album_count,
        track_count,
        albums: None,
    }
}

pub fn playlist_view(playlist: &Playlist) -> PlaylistView {
    PlaylistView {
        id: playlist.id.clone(),
        name: playlist.name.clone(),
        description: playlist.description.clone(),
        cover_url: playlist.cover_url.clone(),
        user_id: playlist.user_id.clone(),
        is_public: playlist.is_public,
        is_smart: playlist.is_smart,
        track_count: playlist.track_count,
        duration: playlist.duration_secs,
        created_at: rfc3339(playlist.created_at),
        updated_at: rfc3339(playlist.updated_at),
        tracks: None,
    }
}
