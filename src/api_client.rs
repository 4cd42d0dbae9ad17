//! Typed client for the restaurant API, as used by the public app.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::helpers::geo::GeoCoords;
use crate::models::restaurant::Restaurant;

pub const API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
}

#[derive(Deserialize, Debug, Clone)]
pub struct RestaurantList {
    pub restaurants: Vec<Restaurant>,
    pub count: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NearbyRestaurant {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub distance: f64,
}

#[derive(Deserialize, Debug)]
struct NearbyList {
    restaurants: Vec<NearbyRestaurant>,
}

pub struct RestaurantClient {
    client: Client,
    base_url: Url,
}

impl RestaurantClient {
    /// Base URL from `NEXT_PUBLIC_API_URL`, defaulting to a local server.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::with_base_url(&base_url)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ClientError> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<T>().await?)),
            status => Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    fn require<T>(url: &Url, value: Option<T>) -> Result<T, ClientError> {
        value.ok_or_else(|| ClientError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND.as_u16(),
            url: url.to_string(),
        })
    }

    pub async fn list_restaurants(&self) -> Result<RestaurantList, ClientError> {
        let url = self.endpoint(&["api", "restaurants"])?;
        let list = self.get_json(url.clone()).await?;
        Self::require(&url, list)
    }

    /// `None` when the API answers 404.
    pub async fn get_restaurant(&self, id: &str) -> Result<Option<Restaurant>, ClientError> {
        let url = self.endpoint(&["api", "restaurants", id])?;
        self.get_json(url).await
    }

    pub async fn nearby(
        &self,
        origin: GeoCoords,
        limit: usize,
    ) -> Result<Vec<NearbyRestaurant>, ClientError> {
        let mut url = self.endpoint(&["api", "restaurants", "nearby"])?;
        url.query_pairs_mut()
            .append_pair("lat", &origin.lat.to_string())
            .append_pair("lng", &origin.lng.to_string())
            .append_pair("limit", &limit.to_string());

        let list: Option<NearbyList> = self.get_json(url.clone()).await?;
        Ok(Self::require(&url, list)?.restaurants)
    }
}

/// Loads the restaurant list, refusing to start a second load while one is
/// still in flight.
///
/// This only deduplicates concurrent loads. Responses are not ordered, so a
/// slow earlier load can still land after a later one.
pub struct RestaurantFeed {
    client: RestaurantClient,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RestaurantFeed {
    pub fn new(client: RestaurantClient) -> Self {
        Self {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// `Ok(None)` means another load was already running and nothing was sent.
    pub async fn load(&self) -> Result<Option<RestaurantList>, ClientError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Restaurant load already in flight, skipping");
            return Ok(None);
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.client.list_restaurants().await.map(Some)
    }
}
