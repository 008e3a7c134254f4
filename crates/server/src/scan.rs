use std::time::SystemTime;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::DEFAULT_USER_ID;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::{AppState, ItemResponse, JsonResult, ScanState};
use crate::utils::{json_error, library_error};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub folders: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub files_found: u32,
    pub files_added: u32,
    pub errors: usize,
}

/// `POST /library/scan` is synchronous: the response carries the final counts.
/// Folders come from the request body, falling back to the user's configured
/// music folders. Overlapping scans are rejected, not queued.
pub async fn trigger_scan(
    State(state): State<AppState>,
    payload: Option<Json<ScanRequest>>,
) -> JsonResult<ItemResponse<ScanSummary>> {
    let folders = payload
        .and_then(|Json(request)| request.folders)
        .filter(|folders| !folders.is_empty());
    let folders = match folders {
        Some(folders) => folders,
        None => {
            state
                .library
                .get_or_create_settings(DEFAULT_USER_ID)
                .map_err(library_error)?
                .music_folders
        }
    };
    if folders.is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "No folders specified"));
    }

    {
        let mut guard = state.scan_state.write();
        if guard.is_scanning() {
            return Err(json_error(
                StatusCode::CONFLICT,
                "scan already in progress",
            ));
        }
        *guard = ScanState::Scanning {
            started: SystemTime::now(),
        };
    }

    info!("Library scan started for {} folders", folders.len());
    let scan_library = state.library.clone();
    let scan_folders = folders.clone();
    let result =
        tokio::task::spawn_blocking(move || library::scan_folders(&scan_library, &scan_folders))
            .await;
    *state.scan_state.write() = ScanState::Idle;

    match result {
        Ok(Ok(outcome)) => Ok(Json(ItemResponse::new(ScanSummary {
            files_found: outcome.files_found,
            files_added: outcome.files_added,
            errors: outcome.errors.len(),
        }))),
        Ok(Err(err)) => Err(library_error(err)),
        Err(err) => Err(json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("scan task failed: {}", err),
        )),
    }
}
