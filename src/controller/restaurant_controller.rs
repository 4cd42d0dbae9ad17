use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::controller::AppState;
use crate::helpers::geo::{bounds_for_points, get_n_closest, Bounds, GeoCoords};
use crate::helpers::heat_color::{date_to_heat_color, restaurant_date_range, DateRange, NEUTRAL_GRAY};
use crate::helpers::normalize::{normalize_price_range, normalize_status};
use crate::models::restaurant::Restaurant;
use crate::repositories::flat_file_repo::{FlatFileRestaurantRepo, StoreError};

pub const DEFAULT_NEARBY_LIMIT: usize = 20;
pub const MAX_NEARBY_LIMIT: usize = 100;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/restaurants", get(list_restaurants))
        .route("/api/restaurants/search", get(search_restaurants))
        .route("/api/restaurants/nearby", get(nearby_restaurants))
        .route("/api/restaurants/map", get(restaurant_map))
        .route("/api/restaurants/:id", get(retrieve_restaurant))
        .route_layer(Extension(app_state.restaurant_repo))
}

fn store_failure(e: StoreError) -> axum::response::Response {
    warn!("Something went wrong reading the restaurant store due to: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to load restaurants, please try again" })),
    )
        .into_response()
}

fn restaurant_list<T: Serialize>(restaurants: Vec<T>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "count": restaurants.len(), "restaurants": restaurants })),
    )
        .into_response()
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ListRestaurantsParam {
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub cuisine: Option<String>,
    pub price_range: Option<String>,
    pub status: Option<String>,
}

impl ListRestaurantsParam {
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        let field_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(wanted) if !wanted.trim().is_empty() => actual
                .as_deref()
                .is_some_and(|actual| same_text(actual, wanted)),
            _ => true,
        };

        let price_matches = match self.price_range.as_deref() {
            Some(wanted) if !wanted.trim().is_empty() => {
                let wanted = normalize_price_range(Some(wanted));
                wanted.is_some() && wanted == normalize_price_range(restaurant.price_range.as_deref())
            }
            _ => true,
        };

        let status_matches = match self.status.as_deref() {
            Some(wanted) if !wanted.trim().is_empty() => restaurant
                .status
                .as_deref()
                .is_some_and(|actual| normalize_status(actual) == normalize_status(wanted)),
            _ => true,
        };

        field_matches(&self.city, &restaurant.location.city)
            && field_matches(&self.neighborhood, &restaurant.location.neighborhood)
            && field_matches(&self.cuisine, &restaurant.cuisine_type)
            && price_matches
            && status_matches
    }
}

pub async fn list_restaurants(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
    Query(query): Query<ListRestaurantsParam>,
) -> impl IntoResponse {
    return match restaurant_repo.load_all().await {
        Ok(restaurants) => restaurant_list(
            restaurants
                .into_iter()
                .filter(|restaurant| query.matches(restaurant))
                .collect(),
        ),
        Err(e) => store_failure(e),
    };
}

pub async fn retrieve_restaurant(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    return match restaurant_repo.find_by_id(&id).await {
        Ok(Some(restaurant)) => (StatusCode::OK, Json(restaurant)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Restaurant not found" })),
        )
            .into_response(),
        Err(e) => store_failure(e),
    };
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SearchRestaurantParam {
    pub q: String,
}

pub async fn search_restaurants(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
    Query(query): Query<SearchRestaurantParam>,
) -> impl IntoResponse {
    return match restaurant_repo.search(&query.q).await {
        Ok(restaurants) => restaurant_list(restaurants),
        Err(e) => store_failure(e),
    };
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NearbyRestaurantParam {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub limit: Option<usize>,
    pub max_distance_km: Option<f64>,
}

pub async fn nearby_restaurants(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
    Query(query): Query<NearbyRestaurantParam>,
) -> impl IntoResponse {
    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) if GeoCoords::new(lat, lng).is_valid() => GeoCoords::new(lat, lng),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Valid lat and lng query parameters are required" })),
            )
                .into_response();
        }
    };
    if let Some(max_distance) = query.max_distance_km {
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "max_distance_km must be a positive number" })),
            )
                .into_response();
        }
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NEARBY_LIMIT)
        .clamp(1, MAX_NEARBY_LIMIT);

    let restaurants = match restaurant_repo.load_all().await {
        Ok(restaurants) => restaurants,
        Err(e) => return store_failure(e),
    };

    let closest: Vec<_> = get_n_closest(&restaurants, origin, limit, Restaurant::coords)
        .into_iter()
        .filter(|located| {
            query
                .max_distance_km
                .map_or(true, |max_distance| located.distance <= max_distance)
        })
        .collect();

    restaurant_list(closest)
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct MapPin {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub heat_color: String,
    pub published_at: Option<String>,
}

#[derive(Clone, Serialize, Debug)]
pub struct RestaurantMap {
    pub count: usize,
    pub pins: Vec<MapPin>,
    pub bounds: Option<Bounds>,
    pub date_range: Option<DateRange>,
}

/// Pins for every located restaurant, coloured by how recently the episode
/// that mentioned it was published.
pub fn build_restaurant_map(restaurants: &[Restaurant]) -> RestaurantMap {
    let date_range = restaurant_date_range(restaurants);

    let pins: Vec<MapPin> = restaurants
        .iter()
        .filter_map(|restaurant| {
            let coords = restaurant.coords()?;
            let heat_color = match date_range {
                Some(range) => date_to_heat_color(restaurant.published_at(), range.min, range.max),
                None => NEUTRAL_GRAY.to_string(),
            };
            Some(MapPin {
                id: restaurant.stable_id()?.to_string(),
                name: restaurant.display_name().to_string(),
                lat: coords.lat,
                lng: coords.lng,
                heat_color,
                published_at: restaurant.published_at().map(str::to_string),
            })
        })
        .collect();

    let points: Vec<GeoCoords> = pins.iter().map(|pin| GeoCoords::new(pin.lat, pin.lng)).collect();

    RestaurantMap {
        count: pins.len(),
        bounds: bounds_for_points(&points),
        pins,
        date_range,
    }
}

pub async fn restaurant_map(
    Extension(restaurant_repo): Extension<Arc<FlatFileRestaurantRepo>>,
) -> impl IntoResponse {
    return match restaurant_repo.load_all().await {
        Ok(restaurants) => (StatusCode::OK, Json(build_restaurant_map(&restaurants))).into_response(),
        Err(e) => store_failure(e),
    };
}
