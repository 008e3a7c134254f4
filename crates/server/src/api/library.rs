use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::{
    album_view, artist_view, playlist_view, track_view, AlbumView, ArtistView, NameIndex,
    PlaylistView, TrackView,
};
use crate::state::{AppState, ItemResponse, JsonResult};
use crate::utils::{json_error, library_error};

const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResults {
    pub tracks: Vec<TrackView>,
    pub albums: Vec<AlbumView>,
    pub artists: Vec<ArtistView>,
    pub playlists: Vec<PlaylistView>,
}

#[derive(Serialize)]
pub struct GenreCount {
    pub name: String,
    pub count: usize,
}

/// Cross-entity substring search. Tracks come back most-played first;
/// playlists only when public.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> JsonResult<ItemResponse<SearchResults>> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase);
    let Some(needle) = needle else {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Query parameter \"q\" is required",
        ));
    };
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);

    let names = NameIndex::load(&state.library).map_err(library_error)?;

    let mut tracks: Vec<common::Track> = state
        .library
        .list_tracks()
        .map_err(library_error)?
        .into_iter()
        .filter(|track| {
            track.title.to_lowercase().contains(&needle)
                || names
                    .artist_name(&track.artist_id)
                    .to_lowercase()
                    .contains(&needle)
                || names
                    .album_title(&track.album_id)
                    .to_lowercase()
                    .contains(&needle)
        })
        .collect();
    tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count));
    tracks.truncate(limit);

    let mut albums: Vec<common::Album> = state
        .library
        .list_albums()
        .map_err(library_error)?
        .into_iter()
        .filter(|album| {
            album.title.to_lowercase().contains(&needle)
                || names
                    .artist_name(&album.artist_id)
                    .to_lowercase()
                    .contains(&needle)
        })
        .collect();
    albums.truncate(limit);

    let mut artists: Vec<common::Artist> = state
        .library
        .list_artists()
        .map_err(library_error)?
        .into_iter()
        .filter(|artist| artist.name.to_lowercase().contains(&needle))
        .collect();
    artists.truncate(limit);

    let mut playlists: Vec<common::Playlist> = state
        .library
        .list_playlists()
        .map_err(library_error)?
        .into_iter()
        .filter(|playlist| {
            playlist.is_public
                && (playlist.name.to_lowercase().contains(&needle)
                    || playlist
                        .description
                        .as_deref()
                        .map(|value| value.to_lowercase().contains(&needle))
                        .unwrap_or(false))
        })
        .collect();
    playlists.truncate(limit);

    let mut artist_albums = std::collections::HashMap::new();
    let mut artist_tracks = std::collections::HashMap::new();
    for album in state.library.list_albums().map_err(library_error)? {
        *artist_albums.entry(album.artist_id).or_insert(0usize) += 1;
    }
    for track in state.library.list_tracks().map_err(library_error)? {
        *artist_tracks.entry(track.artist_id).or_insert(0usize) += 1;
    }

    Ok(Json(ItemResponse::new(SearchResults {
        tracks: tracks.iter().map(|track| track_view(track, &names)).collect(),
        albums: albums.iter().map(|album| album_view(album, &names)).collect(),
        artists: artists
            .iter()
            .map(|artist| {
                artist_view(
                    artist,
                    artist_albums.get(&artist.id).copied().unwrap_or(0),
                    artist_tracks.get(&artist.id).copied().unwrap_or(0),
                )
            })
            .collect(),
        playlists: playlists.iter().map(playlist_view).collect(),
    })))
}

pub async fn stats(
    State(state): State<AppState>,
) -> JsonResult<ItemResponse<::library::LibraryTotals>> {
    let totals = state.library.totals().map_err(library_error)?;
    Ok(Json(ItemResponse::new(totals)))
}

pub async fn genres(State(state): State<AppState>) -> JsonResult<ItemResponse<Vec<GenreCount>>> {
    let counts = state.library.genre_counts().map_err(library_error)?;
    let data = counts
        .into_iter()
        .map(|(name, count)| GenreCount { name, count })
        .collect();
    Ok(Json(ItemResponse::new(data)))
}
