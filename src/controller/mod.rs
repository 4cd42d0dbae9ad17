use std::sync::Arc;

use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::controller::google_places_api::PhotoProxy;
use crate::helpers::handler_404::page_not_found_handler;
use crate::repositories::flat_file_repo::FlatFileRestaurantRepo;

pub mod google_places_api;
pub mod health_check;
pub mod restaurant_controller;

#[derive(Clone)]
pub struct AppState {
    pub restaurant_repo: Arc<FlatFileRestaurantRepo>,
    pub photo_proxy: Arc<PhotoProxy>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            restaurant_repo: Arc::new(FlatFileRestaurantRepo::new(config.data_dirs.clone())),
            photo_proxy: Arc::new(PhotoProxy::new(
                config.places_api_key(),
                config.places_legacy_base_url.clone(),
                config.places_v1_base_url.clone(),
            )),
        }
    }
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let app_state = AppState::from_config(config);
    if config.places_api_key().is_none() {
        info!("No Google Places API key configured, photo proxy will answer 500");
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_origin(config.allowed_origins())
        .allow_headers([CONTENT_TYPE]);
    let application = build_app(app_state, cors);

    let addr = config.bind_addr();
    info!("API server listening on: {}", addr);
    axum::Server::bind(&addr)
        .serve(application.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error spinning up the API server")
}

pub fn build_app(app_state: AppState, cors: CorsLayer) -> Router {
    router_endpoints(app_state)
        .fallback(page_not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}

pub fn router_endpoints(app_state: AppState) -> Router {
    Router::new()
        .merge(health_check::router(app_state.clone()))
        .merge(restaurant_controller::router(app_state.clone()))
        .merge(google_places_api::router(app_state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping API server");
}
