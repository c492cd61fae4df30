mod albums;
mod media;

use axum::Router;
use crate::app::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(albums::router())
        .merge(media::router())
}
