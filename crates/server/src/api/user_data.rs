use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{UserSettings, DEFAULT_USER_ID};
use library::SettingsPatch;
use serde::{Deserialize, Serialize};

use crate::api::views::{playlist_view, track_view, NameIndex, PlaylistView, TrackView};
use crate::state::{AppState, ItemResponse, JsonResult, ListResponse, MessageResponse};
use crate::utils::{json_error, library_error, paginate, rfc3339, DEFAULT_PAGE_SIZE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub user_id: Option<String>,
}

fn user_id(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(DEFAULT_USER_ID)
}

// ----- playlists -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub is_smart: Option<bool>,
    pub smart_rules: Option<serde_json::Value>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistTracksRequest {
    #[serde(default)]
    pub track_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[serde(default)]
    pub track_order: Vec<ReorderEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub track_id: String,
    pub position: u32,
}

pub async fn list_playlists(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> JsonResult<ListResponse<PlaylistView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let mut playlists = state.library.list_playlists().map_err(library_error)?;
    if let Some(user) = &query.user_id {
        playlists.retain(|playlist| &playlist.user_id == user);
    }
    playlists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

    let (page_items, total) = paginate(playlists, page, page_size);
    let data = page_items.iter().map(playlist_view).collect();
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Json(payload): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<ItemResponse<PlaylistView>>), (StatusCode, Json<crate::state::ErrorResponse>)>
{
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let Some(name) = name else {
        return Err(json_error(StatusCode::BAD_REQUEST, "name is required"));
    };

    let smart_rules = match &payload.smart_rules {
        Some(rules) => Some(
            serde_json::to_string(rules)
                .map_err(|err| json_error(StatusCode::BAD_REQUEST, err.to_string()))?,
        ),
        None => None,
    };
    let playlist = state
        .library
        .create_playlist(
            name.to_string(),
            payload.description.clone(),
            user_id(&payload.user_id).to_string(),
            payload.is_public.unwrap_or(false),
            payload.is_smart.unwrap_or(false),
            smart_rules,
        )
        .map_err(library_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::new(playlist_view(&playlist))),
    ))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
) -> JsonResult<ItemResponse<PlaylistView>> {
    let playlist = match state.library.get_playlist(&playlist_id) {
        Ok(Some(playlist)) => playlist,
        Ok(None) => return Err(json_error(StatusCode::NOT_FOUND, "playlist not found")),
        Err(err) => return Err(library_error(err)),
    };
    let names = NameIndex::load(&state.library).map_err(library_error)?;

    let mut tracks: Vec<TrackView> = Vec::with_capacity(playlist.track_ids.len());
    for track_id in &playlist.track_ids {
        if let Some(track) = state.library.get_track(track_id).map_err(library_error)? {
            tracks.push(track_view(&track, &names));
        }
    }
    let mut view = playlist_view(&playlist);
    view.tracks = Some(tracks);
    Ok(Json(ItemResponse::new(view)))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
    Json(payload): Json<UpdatePlaylistRequest>,
) -> JsonResult<ItemResponse<PlaylistView>> {
    let updated = state
        .library
        .update_playlist_meta(
            &playlist_id,
            payload.name,
            payload.description,
            payload.is_public,
            payload.cover_url,
        )
        .map_err(library_error)?;
    match updated {
        Some(playlist) => Ok(Json(ItemResponse::new(playlist_view(&playlist)))),
        None => Err(json_error(StatusCode::NOT_FOUND, "playlist not found")),
    }
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
) -> JsonResult<MessageResponse> {
    let deleted = state
        .library
        .delete_playlist(&playlist_id)
        .map_err(library_error)?;
    if deleted {
        Ok(Json(MessageResponse::new("Playlist deleted")))
    } else {
        Err(json_error(StatusCode::NOT_FOUND, "playlist not found"))
    }
}

pub async fn add_playlist_tracks(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
    Json(payload): Json<PlaylistTracksRequest>,
) -> JsonResult<MessageResponse> {
    if payload.track_ids.is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "trackIds required"));
    }
    let added = state
        .library
        .add_playlist_tracks(&playlist_id, &payload.track_ids)
        .map_err(library_error)?;
    match added {
        Some(added) => Ok(Json(MessageResponse::new(format!(
            "Added {} tracks",
            added
        )))),
        None => Err(json_error(StatusCode::NOT_FOUND, "playlist not found")),
    }
}

pub async fn remove_playlist_tracks(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
    Json(payload): Json<PlaylistTracksRequest>,
) -> JsonResult<MessageResponse> {
    let removed = state
        .library
        .remove_playlist_tracks(&playlist_id, &payload.track_ids)
        .map_err(library_error)?;
    match removed {
        Some(_) => Ok(Json(MessageResponse::new("Tracks removed"))),
        None => Err(json_error(StatusCode::NOT_FOUND, "playlist not found")),
    }
}

pub async fn reorder_playlist_tracks(
    State(state): State<AppState>,
    AxumPath(playlist_id): AxumPath<String>,
    Json(payload): Json<ReorderRequest>,
) -> JsonResult<MessageResponse> {
    let order: Vec<(String, u32)> = payload
        .track_order
        .into_iter()
        .map(|entry| (entry.track_id, entry.position))
        .collect();
    let reordered = state
        .library
        .reorder_playlist_tracks(&playlist_id, &order)
        .map_err(library_error)?;
    match reordered {
        Some(_) => Ok(Json(MessageResponse::new("Track order updated"))),
        None => Err(json_error(StatusCode::NOT_FOUND, "playlist not found")),
    }
}

// ----- favorites -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub track_id: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteQuery {
    pub track_id: String,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteState {
    pub is_favorite: bool,
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> JsonResult<ListResponse<TrackView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let user = user_id(&query.user_id);

    let favorites = state.library.list_favorites(user).map_err(library_error)?;
    let (page_favorites, total) = paginate(favorites, page, page_size);

    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let mut data = Vec::with_capacity(page_favorites.len());
    for favorite in &page_favorites {
        if let Some(track) = state
            .library
            .get_track(&favorite.track_id)
            .map_err(library_error)?
        {
            let mut view = track_view(&track, &names);
            view.is_favorite = Some(true);
            view.favorited_at = Some(rfc3339(favorite.created_at));
            data.push(view);
        }
    }
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

/// Toggle semantics: favoriting an already-favorited track unfavorites it.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Json(payload): Json<FavoriteRequest>,
) -> JsonResult<ItemResponse<FavoriteState>> {
    let is_favorite = state
        .library
        .toggle_favorite(user_id(&payload.user_id), &payload.track_id)
        .map_err(library_error)?;
    Ok(Json(ItemResponse::new(FavoriteState { is_favorite })))
}

/// Explicit removal for collaborators that cannot express a toggle;
/// idempotent.
pub async fn remove_favorite(
    State(state): State<AppState>,
    Query(query): Query<FavoriteQuery>,
) -> JsonResult<ItemResponse<FavoriteState>> {
    state
        .library
        .remove_favorite(user_id(&query.user_id), &query.track_id)
        .map_err(library_error)?;
    Ok(Json(ItemResponse::new(FavoriteState { is_favorite: false })))
}

// ----- play history -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub track_id: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> JsonResult<ListResponse<TrackView>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let user = user_id(&query.user_id);

    let history = state.library.list_history(user).map_err(library_error)?;
    let (page_entries, total) = paginate(history, page, page_size);

    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let mut data = Vec::with_capacity(page_entries.len());
    for entry in &page_entries {
        if let Some(track) = state
            .library
            .get_track(&entry.track_id)
            .map_err(library_error)?
        {
            let mut view = track_view(&track, &names);
            view.played_at = Some(rfc3339(entry.played_at));
            data.push(view);
        }
    }
    Ok(Json(ListResponse::new(data, total, page, page_size)))
}

pub async fn record_play(
    State(state): State<AppState>,
    Json(payload): Json<HistoryRequest>,
) -> JsonResult<MessageResponse> {
    state
        .library
        .add_history(user_id(&payload.user_id), &payload.track_id)
        .map_err(library_error)?;
    Ok(Json(MessageResponse::new("Play recorded")))
}

pub async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> JsonResult<MessageResponse> {
    state
        .library
        .clear_history(user_id(&query.user_id))
        .map_err(library_error)?;
    Ok(Json(MessageResponse::new("History cleared")))
}

// ----- persisted queue -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQueueRequest {
    #[serde(default)]
    pub track_ids: Vec<String>,
    pub source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItemView {
    pub id: u32,
    pub position: u32,
    pub source: String,
    pub track: TrackView,
}

pub async fn get_queue(
    State(state): State<AppState>,
) -> JsonResult<ItemResponse<Vec<QueueItemView>>> {
    let entries = state.library.get_queue().map_err(library_error)?;
    let names = NameIndex::load(&state.library).map_err(library_error)?;
    let mut data = Vec::with_capacity(entries.len());
    for entry in &entries {
        if let Some(track) = state
            .library
            .get_track(&entry.track_id)
            .map_err(library_error)?
        {
            data.push(QueueItemView {
                id: entry.position,
                position: entry.position,
                source: entry.source.clone(),
                track: track_view(&track, &names),
            });
        }
    }
    Ok(Json(ItemResponse::new(data)))
}

pub async fn set_queue(
    State(state): State<AppState>,
    Json(payload): Json<SetQueueRequest>,
) -> JsonResult<MessageResponse> {
    let source = payload.source.as_deref().unwrap_or("manual");
    state
        .library
        .set_queue(&payload.track_ids, source)
        .map_err(library_error)?;
    Ok(Json(MessageResponse::new("Queue updated")))
}

pub async fn clear_queue(State(state): State<AppState>) -> JsonResult<MessageResponse> {
    state.library.clear_queue().map_err(library_error)?;
    Ok(Json(MessageResponse::new("Queue cleared")))
}

// ----- settings -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateRequest {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub patch: SettingsPatch,
}

pub async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> JsonResult<ItemResponse<UserSettings>> {
    let settings = state
        .library
        .get_or_create_settings(user_id(&query.user_id))
        .map_err(library_error)?;
    Ok(Json(ItemResponse::new(settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<SettingsUpdateRequest>,
) -> JsonResult<ItemResponse<UserSettings>> {
    let settings = state
        .library
        .update_settings(user_id(&payload.user_id), &payload.patch)
        .map_err(library_error)?;
    Ok(Json(ItemResponse::new(settings)))
}
