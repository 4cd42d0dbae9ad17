use std::sync::Arc;

use axum::body::StreamBody;
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::controller::AppState;

pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const MAX_WIDTH_LIMIT: u32 = 4800;
pub const PHOTO_CACHE_CONTROL: &str = "public, max-age=604800, immutable";

#[derive(Debug, Error)]
pub enum PhotoProxyError {
    #[error("Google Places API key is not configured")]
    MissingApiKey,

    #[error("photo reference is required")]
    MissingReference,

    #[error("photo reference contains unsupported characters")]
    InvalidReference,

    #[error("upstream photo request failed with status {0}")]
    Upstream(u16),

    #[error("upstream photo request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PhotoProxyError {
    fn status(&self) -> StatusCode {
        match self {
            PhotoProxyError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            PhotoProxyError::MissingReference | PhotoProxyError::InvalidReference => {
                StatusCode::BAD_REQUEST
            }
            PhotoProxyError::Upstream(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            PhotoProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PhotoProxyError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Google hands out two photo reference formats: opaque legacy tokens and
/// Places API (New) resource names shaped like `places/{id}/photos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoReference<'a> {
    Legacy(&'a str),
    PlacesV1(&'a str),
}

impl<'a> PhotoReference<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, PhotoProxyError> {
        let reference = raw.trim().trim_matches('/');
        if reference.is_empty() {
            return Err(PhotoProxyError::MissingReference);
        }

        let allowed = reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
        if !allowed || reference.split('/').any(|segment| segment.is_empty()) {
            return Err(PhotoProxyError::InvalidReference);
        }

        if reference.starts_with("places/") && reference.contains("/photos/") {
            Ok(PhotoReference::PlacesV1(reference))
        } else if reference.contains('/') {
            Err(PhotoProxyError::InvalidReference)
        } else {
            Ok(PhotoReference::Legacy(reference))
        }
    }
}

pub struct UpstreamPhoto {
    pub content_type: String,
    pub response: reqwest::Response,
}

pub struct PhotoProxy {
    client: reqwest::Client,
    api_key: Option<String>,
    legacy_base_url: String,
    v1_base_url: String,
}

impl PhotoProxy {
    pub fn new(
        api_key: Option<String>,
        legacy_base_url: impl Into<String>,
        v1_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            legacy_base_url: legacy_base_url.into(),
            v1_base_url: v1_base_url.into(),
        }
    }

    pub fn upstream_url(
        &self,
        reference: PhotoReference<'_>,
        max_width: u32,
        api_key: &str,
    ) -> Result<Url, PhotoProxyError> {
        let base = match reference {
            PhotoReference::Legacy(_) => self.legacy_base_url.trim_end_matches('/'),
            PhotoReference::PlacesV1(_) => self.v1_base_url.trim_end_matches('/'),
        };

        let url = match reference {
            PhotoReference::Legacy(token) => Url::parse_with_params(
                &format!("{base}/maps/api/place/photo"),
                &[
                    ("maxwidth", max_width.to_string().as_str()),
                    ("photo_reference", token),
                    ("key", api_key),
                ],
            ),
            PhotoReference::PlacesV1(name) => Url::parse_with_params(
                &format!("{base}/v1/{name}/media"),
                &[("maxWidthPx", max_width.to_string().as_str()), ("key", api_key)],
            ),
        };

        url.map_err(|e| {
            error!("Failed to build upstream photo URL: {}", e);
            PhotoProxyError::InvalidReference
        })
    }

    pub async fn fetch(
        &self,
        raw_reference: &str,
        max_width: u32,
    ) -> Result<UpstreamPhoto, PhotoProxyError> {
        let api_key = self.api_key.as_deref().ok_or(PhotoProxyError::MissingApiKey)?;
        let reference = PhotoReference::parse(raw_reference)?;
        let url = self.upstream_url(reference, max_width, api_key)?;

        debug!(?reference, max_width, "Fetching photo from Google Places");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(?reference, "Google Places photo request returned {}", status);
            return Err(PhotoProxyError::Upstream(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        Ok(UpstreamPhoto {
            content_type,
            response,
        })
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/photos", get(missing_photo_reference))
        .route("/api/photos/", get(missing_photo_reference))
        .route("/api/photos/*reference", get(proxy_photo))
        .route_layer(Extension(app_state.photo_proxy))
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct PhotoParams {
    pub maxwidth: Option<String>,
}

impl PhotoParams {
    pub fn max_width(&self) -> u32 {
        self.maxwidth
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_WIDTH)
            .clamp(1, MAX_WIDTH_LIMIT)
    }
}

pub async fn proxy_photo(
    Extension(photo_proxy): Extension<Arc<PhotoProxy>>,
    Path(reference): Path<String>,
    Query(params): Query<PhotoParams>,
) -> impl IntoResponse {
    return match photo_proxy.fetch(&reference, params.max_width()).await {
        Ok(photo) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, photo.content_type),
                (header::CACHE_CONTROL, PHOTO_CACHE_CONTROL.to_string()),
            ],
            StreamBody::new(photo.response.bytes_stream()),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to proxy photo {} due to: {}", reference, e);
            e.into_response()
        }
    };
}

async fn missing_photo_reference(
    Extension(photo_proxy): Extension<Arc<PhotoProxy>>,
) -> impl IntoResponse {
    if photo_proxy.api_key.is_none() {
        return PhotoProxyError::MissingApiKey.into_response();
    }
    PhotoProxyError::MissingReference.into_response()
}
