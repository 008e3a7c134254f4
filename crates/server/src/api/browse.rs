use std::collections::HashMap;

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::Album;
use serde::Deserialize;

use crate::api::views::{album_view, artist_view, track_view, AlbumView, ArtistView, NameIndex};
use crate::state::{AppState, ItemResponse, JsonResult, ListResponse};
use crate::utils::{json_error, library_error, paginate, DEFAULT_PAGE_SIZE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

pub async fn list_albums(
    State(state): State<AppState>,
    Query(query): Query<AlbumListQuery>,
) -> JsonResult<ListResponse<AlbumView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let mut albums: Vec<Album> = state
        .library
        .list_albums()
        .map_err(library_error)?
        .into_iter()
        .filter(|album| {
            if let Some(genre) = &query.genre {
                if album.genre.as_deref() != Some(genre.as_str()) {
                    return false;
                }
            }
            if let Some(artist_id) = &query.artist_id {
                if &album.artist_id != artist_id {
                    return false;
                }
            }
            if let Some(year) = query.year {
                if album.year != Some(year) {
                    return false;
                }
            }
            if let Some(search) = &query.search {
                let needle = search.to_lowercase();
                let title = album.title.to_lowercase();
                let artist = names.artist_name(&album.artist_id).to_lowercase();
                if !needle.is_empty() && !title.contains(&needle) && !artist.contains(&needle) {
                    return false;
                }
            }
            true
        })
        .collect();
    sort_albums(&mut albums, query.sort.as_deref(), query.order.as_deref(), &names);

    let (page_albums, total) = paginate(albums, page, page_size);
    let data = page_albums
        .iter()
        .map(|album| album_view(album, &names))
        .collect();
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

/// Album detail, tracks nested in album order.
pub async fn get_album(
    State(state): State<AppState>,
    AxumPath(album_id): AxumPath<String>,
) -> JsonResult<ItemResponse<AlbumView>> {
    let album = match state.library.get_album(&album_id) {
        Ok(Some(album)) => album,
        Ok(None) => return Err(json_error(StatusCode::NOT_FOUND, "album not found")),
        Err(err) => return Err(library_error(err)),
    };
    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let tracks = state
        .library
        .get_album_tracks(&album_id)
        .map_err(library_error)?;

    let mut view = album_view(&album, &names);
    view.tracks = Some(tracks.iter().map(|track| track_view(track, &names)).collect());
    Ok(Json(ItemResponse::new(view)))
}

pub async fn list_artists(
    State(state): State<AppState>,
    Query(query): Query<ArtistListQuery>,
) -> JsonResult<ListResponse<ArtistView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let (album_counts, track_counts) = artist_counts(&state)?;
    let mut artists = state.library.list_artists().map_err(library_error)?;
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        if !needle.is_empty() {
            artists.retain(|artist| artist.name.to_lowercase().contains(&needle));
        }
    }

    let descending = matches!(query.order.as_deref(), Some("desc"));
    match query.sort.as_deref().unwrap_or("name") {
        "dateAdded" => artists.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
        _ => artists.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
    }
    if descending {
        artists.reverse();
    }

    let (page_artists, total) = paginate(artists, page, page_size);
    let data = page_artists
        .iter()
        .map(|artist| {
            artist_view(
                artist,
                album_counts.get(&artist.id).copied().unwrap_or(0),
                track_counts.get(&artist.id).copied().unwrap_or(0),
            )
        })
        .collect();
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

/// Artist detail, albums nested newest first.
pub async fn get_artist(
    State(state): State<AppState>,
    AxumPath(artist_id): AxumPath<String>,
) -> JsonResult<ItemResponse<ArtistView>> {
    let artist = match state.library.get_artist(&artist_id) {
        Ok(Some(artist)) => artist,
        Ok(None) => return Err(json_error(StatusCode::NOT_FOUND, "artist not found")),
        Err(err) => return Err(library_error(err)),
    };
    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let (album_counts, track_counts) = artist_counts(&state)?;

    let mut albums: Vec<Album> = state
        .library
        .list_albums()
        .map_err(library_error)?
        .into_iter()
        .filter(|album| album.artist_id == artist_id)
        .collect();
    albums.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| a.title.cmp(&b.title)));

    let mut view = artist_view(
        &artist,
        album_counts.get(&artist.id).copied().unwrap_or(0),
        track_counts.get(&artist.id).copied().unwrap_or(0),
    );
    view.albums = Some(albums.iter().map(|album| album_view(album, &names)).collect());
    Ok(Json(ItemResponse::new(view)))
}

type Counts = HashMap<String, usize>;

fn artist_counts(
    state: &AppState,
) -> Result<(Counts, Counts), (StatusCode, Json<crate::state::ErrorResponse>)> {
    let mut album_counts: Counts = HashMap::new();
    for album in state.library.list_albums().map_err(library_error)? {
        *album_counts.entry(album.artist_id).or_insert(0) += 1;
    }
    let mut track_counts: Counts = HashMap::new();
    for track in state.library.list_tracks().map_err(library_error)? {
        *track_counts.entry(track.artist_id).or_insert(0) += 1;
    }
    Ok((album_counts, track_counts))
}

fn sort_albums(albums: &mut [Album], sort: Option<&str>, order: Option<&str>, names: &NameIndex) {
    let descending = matches!(order, Some("desc"));
    match sort.unwrap_or("title") {
        "artist" => albums.sort_by(|a, b| {
            names
                .artist_name(&a.artist_id)
                .to_lowercase()
                .cmp(&names.artist_name(&b.artist_id).to_lowercase())
                .then_with(|| a.year.cmp(&b.year))
        }),
        "year" => albums.sort_by(|a, b| a.year.cmp(&b.year)),
        "trackCount" => albums.sort_by(|a, b| a.track_count.cmp(&b.track_count)),
        "dateAdded" => albums.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
        _ => albums.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
    }
    if descending {
        albums.reverse();
    }
}
