use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::logging::request_logger;
use crate::retry::RetryPolicy;
use crate::routes::api_router;
use crate::store::MediaStore;
use crate::usecases::{GetAlbums, GetMedia};
use crate::VERSION;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    pub fn get_albums(&self) -> GetAlbums {
        GetAlbums::new(self.store.clone(), self.retry_policy())
    }

    pub fn get_media(&self) -> GetMedia {
        GetMedia::new(
            self.store.clone(),
            self.config.paging.clone(),
            self.retry_policy(),
        )
    }
}

#[derive(Serialize)]
struct HealthcheckResponse {
    status: String,
    version: String,
}

async fn healthcheck() -> Json<HealthcheckResponse> {
    Json(HealthcheckResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

pub fn create_app(config: Arc<Config>, store: Arc<dyn MediaStore>) -> Router {
    let state = AppState { config, store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/healthcheck", get(healthcheck))
        .merge(api_router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
        .with_state(state)
}
