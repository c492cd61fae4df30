use axum::{body::Bytes, extract::State, routing::post, Json, Router};

use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AlbumListRequest, AlbumListResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/album/list", post(list_albums))
}

/// An empty body means the default filter; anything else must be valid JSON.
fn parse_request(body: &[u8]) -> AppResult<AlbumListRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AlbumListRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid album list request: {}", e)))
}

async fn list_albums(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<AlbumListResponse>> {
    let request = parse_request(&body)?;
    let albums = state.get_albums().snapshot(request.filter).await?;
    Ok(Json(AlbumListResponse { albums }))
}
