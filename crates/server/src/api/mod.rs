pub mod browse;
pub mod library;
pub mod tracks;
pub mod user_data;
pub mod views;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::scan;
use crate::state::AppState;
use crate::streaming;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tracks", get(tracks::list_tracks))
        .route(
            "/tracks/:track_id",
            get(tracks::get_track).patch(tracks::update_track),
        )
        .route("/tracks/:track_id/stream", get(streaming::stream_track))
        .route(
            "/tracks/:track_id/lyrics",
            get(tracks::get_lyrics).put(tracks::update_lyrics),
        )
        .route("/tracks/:track_id/cover", get(streaming::get_cover))
        .route("/albums", get(browse::list_albums))
        .route("/albums/:album_id", get(browse::get_album))
        .route("/artists", get(browse::list_artists))
        .route("/artists/:artist_id", get(browse::get_artist))
        .route(
            "/playlists",
            get(user_data::list_playlists).post(user_data::create_playlist),
        )
        .route(
            "/playlists/:playlist_id",
            get(user_data::get_playlist)
                .patch(user_data::update_playlist)
                .delete(user_data::delete_playlist),
        )
        .route(
            "/playlists/:playlist_id/tracks",
            post(user_data::add_playlist_tracks)
                .delete(user_data::remove_playlist_tracks)
                .patch(user_data::reorder_playlist_tracks),
        )
        .route(
            "/favorites",
            get(user_data::list_favorites)
                .post(user_data::toggle_favorite)
                .delete(user_data::remove_favorite),
        )
        .route(
            "/history",
            get(user_data::list_history)
                .post(user_data::record_play)
                .delete(user_data::clear_history),
        )
        .route(
            "/queue",
            get(user_data::get_queue)
                .post(user_data::set_queue)
                .delete(user_data::clear_queue),
        )
        .route(
            "/settings",
            get(user_data::get_settings).patch(user_data::update_settings),
        )
        .route("/search", get(library::search))
        .route("/library/stats", get(library::stats))
        .route("/library/genres", get(library::genres))
        .route("/library/scan", post(scan::trigger_scan))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
