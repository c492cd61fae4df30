use axum::{extract::State, routing::post, Json, Router};

use crate::app::AppState;
use crate::constants::MAX_PAGE_SIZE;
use crate::error::AppResult;
use crate::models::{MediaListRequest, MediaPage};

pub fn router() -> Router<AppState> {
    Router::new().route("/media/list", post(list_media))
}

async fn list_media(
    State(state): State<AppState>,
    Json(request): Json<MediaListRequest>,
) -> AppResult<Json<MediaPage>> {
    // Non-positive sizes go through so the engine rejects them.
    let page_size = request
        .page_size
        .unwrap_or(state.config.paging.page_size)
        .min(MAX_PAGE_SIZE);

    let page = state
        .get_media()
        .page(
            request.media_type,
            request.filter,
            request.album_id,
            request.key,
            page_size,
        )
        .await?;

    Ok(Json(page))
}
