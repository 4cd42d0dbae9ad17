use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::controller::AppState;
use crate::repositories::flat_file_repo::FlatFileRestaurantRepo;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health_check))
        .route_layer(Extension(app_state.restaurant_repo))
}

/// Always 200; `data_directory` says whether the flat-file store resolved.
async fn get_health_check(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
) -> impl IntoResponse {
    let data_directory = match restaurant_repo.resolve_data_dir().await {
        Some(_) => "found",
        None => "missing",
    };

    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "data_directory": data_directory })),
    )
}
