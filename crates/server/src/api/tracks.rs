use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::Track;
use player::lyrics::{parse_lyrics, LyricLine};
use serde::{Deserialize, Serialize};

use crate::api::views::{track_view, NameIndex, TrackView};
use crate::state::{AppState, ItemResponse, JsonResult, ListResponse, MessageResponse};
use crate::utils::{json_error, library_error, paginate, DEFAULT_PAGE_SIZE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub year: Option<i32>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPatch {
    pub rating: Option<u8>,
    pub lyrics: Option<String>,
    pub lyrics_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsUpdate {
    pub lyrics: Option<String>,
    pub lyrics_type: Option<String>,
}

#[derive(Serialize)]
pub struct LyricsData {
    pub lyrics: Option<String>,
    #[serde(rename = "type")]
    pub lyrics_type: Option<String>,
    pub lines: Vec<LyricLine>,
}

pub async fn list_tracks(
    State(state): State<AppState>,
    Query(query): Query<TrackListQuery>,
) -> JsonResult<ListResponse<TrackView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let mut tracks: Vec<Track> = state
        .library
        .list_tracks()
        .map_err(library_error)?
        .into_iter()
        .filter(|track| matches_filters(track, &query, &names))
        .collect();
    sort_tracks(&mut tracks, query.sort.as_deref(), query.order.as_deref(), &names);

    let (page_tracks, total) = paginate(tracks, page, page_size);
    let data = page_tracks
        .iter()
        .map(|track| track_view(track, &names))
        .collect();
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

pub async fn get_track(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
) -> JsonResult<ItemResponse<TrackView>> {
    let track = fetch_track(&state, &track_id)?;
    let names = NameIndex::load(&state.library).map_err(library_error)?;
    Ok(Json(ItemResponse::new(track_view(&track, &names))))
}

/// `PATCH /tracks/:id`: rating and lyrics edits only; everything else is
/// owned by the scanner.
pub async fn update_track(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
    Json(patch): Json<TrackPatch>,
) -> JsonResult<ItemResponse<TrackView>> {
    fetch_track(&state, &track_id)?;

    if let Some(rating) = patch.rating {
        state
            .library
            .set_track_rating(&track_id, rating)
            .map_err(library_error)?;
    }
    if patch.lyrics.is_some() || patch.lyrics_type.is_some() {
        let current = fetch_track(&state, &track_id)?;
        let lyrics = patch.lyrics.or(current.lyrics);
        let lyrics_type = patch.lyrics_type.or(current.lyrics_type);
        state
            .library
            .set_track_lyrics(&track_id, lyrics, lyrics_type)
            .map_err(library_error)?;
    }

    let track = fetch_track(&state, &track_id)?;
    let names = NameIndex::load(&state.library).map_err(library_error)?;
    Ok(Json(ItemResponse::new(track_view(&track, &names))))
}

pub async fn get_lyrics(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
) -> JsonResult<ItemResponse<LyricsData>> {
    let track = fetch_track(&state, &track_id)?;
    let data = match &track.lyrics {
        Some(raw) => LyricsData {
            lines: parse_lyrics(raw, track.lyrics_type.as_deref()),
            lyrics: track.lyrics.clone(),
            lyrics_type: track.lyrics_type.clone(),
        },
        None => LyricsData {
            lyrics: None,
            lyrics_type: None,
            lines: Vec::new(),
        },
    };
    Ok(Json(ItemResponse::new(data)))
}

pub async fn update_lyrics(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
    Json(update): Json<LyricsUpdate>,
) -> JsonResult<MessageResponse> {
    let updated = state
        .library
        .set_track_lyrics(&track_id, update.lyrics, update.lyrics_type)
        .map_err(library_error)?;
    if updated.is_none() {
        return Err(json_error(StatusCode::NOT_FOUND, "track not found"));
    }
    Ok(Json(MessageResponse::new("Lyrics updated")))
}

fn fetch_track(
    state: &AppState,
    track_id: &str,
) -> Result<Track, (StatusCode, Json<crate::state::ErrorResponse>)> {
    match state.library.get_track(track_id) {
        Ok(Some(track)) => Ok(track),
        Ok(None) => Err(json_error(StatusCode::NOT_FOUND, "track not found")),
        Err(err) => Err(library_error(err)),
    }
}

fn matches_filters(track: &Track, query: &TrackListQuery, names: &NameIndex) -> bool {
    if let Some(genre) = &query.genre {
        if track.genre.as_deref() != Some(genre.as_str()) {
            return false;
        }
    }
    if let Some(year) = query.year {
        if track.year != Some(year) {
            return false;
        }
    }
    if let Some(artist_id) = &query.artist_id {
        if &track.artist_id != artist_id {
            return false;
        }
    }
    if let Some(album_id) = &query.album_id {
        if &track.album_id != album_id {
            return false;
        }
    }
    if let Some(format) = &query.format {
        if !track.format.eq_ignore_ascii_case(format) {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let title = track.title.to_lowercase();
        let artist = names.artist_name(&track.artist_id).to_lowercase();
        let album = names.album_title(&track.album_id).to_lowercase();
        if !title.contains(&needle) && !artist.contains(&needle) && !album.contains(&needle) {
            return false;
        }
    }
    true
}

/// Unrecognized sort keys silently fall back to title ascending.
fn sort_tracks(tracks: &mut [Track], sort: Option<&str>, order: Option<&str>, names: &NameIndex) {
    let descending = matches!(order, Some("desc"));
    match sort.unwrap_or("title") {
        "artist" => tracks.sort_by(|a, b| {
            names
                .artist_name(&a.artist_id)
                .to_lowercase()
                .cmp(&names.artist_name(&b.artist_id).to_lowercase())
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }),
        "album" => tracks.sort_by(|a, b| {
            names
                .album_title(&a.album_id)
                .to_lowercase()
                .cmp(&names.album_title(&b.album_id).to_lowercase())
                .then_with(|| a.disc_no.cmp(&b.disc_no))
                .then_with(|| a.track_no.cmp(&b.track_no))
        }),
        "year" => tracks.sort_by(|a, b| a.year.cmp(&b.year)),
        "duration" => tracks.sort_by(|a, b| a.duration_secs.cmp(&b.duration_secs)),
        "playCount" => tracks.sort_by(|a, b| a.play_count.cmp(&b.play_count)),
        "rating" => tracks.sort_by(|a, b| a.rating.cmp(&b.rating)),
        "dateAdded" => tracks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
        _ => tracks.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
    }
    if descending {
        tracks.reverse();
    }
}
