//! Router-level tests over a temporary flat-file data directory.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use where2eat::controller::google_places_api::{PhotoProxy, PHOTO_CACHE_CONTROL};
use where2eat::controller::{build_app, AppState};
use where2eat::helpers::geo::{haversine_distance, GeoCoords};
use where2eat::repositories::flat_file_repo::FlatFileRestaurantRepo;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: GeoCoords = GeoCoords { lat: 32.0853, lng: 34.7818 };

fn write_record(dir: &Path, name: &str, record: Value) {
    std::fs::write(dir.join(name), record.to_string()).expect("write record");
}

fn seed(dir: &Path) {
    write_record(
        dir,
        "florentin.json",
        json!({
            "name_hebrew": "בית קפה בפלורנטין",
            "cuisine_type": "Cafe",
            "price_range": "זול",
            "location": {"city": "תל אביב", "neighborhood": "פלורנטין", "lat": 32.0566, "lng": 34.7696},
            "episode_info": {"video_id": "v1", "published_at": "2024-01-10"},
            "google_places": {"place_id": "place-florentin"}
        }),
    );
    write_record(
        dir,
        "north.json",
        json!({
            "name_hebrew": "ביסטרו בצפון",
            "name_english": "North Bistro",
            "cuisine_type": "French",
            "price_range": "expensive",
            "location": {"city": "תל אביב", "neighborhood": "הצפון הישן", "lat": 32.0880, "lng": 34.7760},
            "episode_info": {"video_id": "v2", "published_at": "2024-03-15"},
            "google_places": {"place_id": "place-north"}
        }),
    );
    write_record(
        dir,
        "haifa.json",
        json!({
            "id": "haifa-1",
            "name_hebrew": "חומוס בחיפה",
            "cuisine_type": "Middle Eastern",
            "price_range": "בינוני",
            "location": {"city": "חיפה", "lat": 32.7940, "lng": 34.9896},
            "episode_info": {"video_id": "v3", "published_at": "invalid"}
        }),
    );
    write_record(dir, "corrupt.json", json!({"name_hebrew": "בלי מזהה"}));
    std::fs::write(dir.join("half.json"), "{\"id\": ").expect("write broken file");
}

fn app_with(data_dir: &Path, photo_proxy: PhotoProxy) -> Router {
    let state = AppState {
        restaurant_repo: Arc::new(FlatFileRestaurantRepo::new(vec![
            data_dir.join("missing"),
            data_dir.to_path_buf(),
        ])),
        photo_proxy: Arc::new(photo_proxy),
    };
    build_app(state, CorsLayer::permissive())
}

fn app(data_dir: &Path) -> Router {
    app_with(
        data_dir,
        PhotoProxy::new(None, "http://127.0.0.1:1", "http://127.0.0.1:1"),
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = hyper::body::to_bytes(response.into_body())
        .await
        .expect("body bytes");
    (status, body.to_vec(), headers)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body, _) = get(app, uri).await;
    let json = serde_json::from_slice(&body).expect("json body");
    (status, json)
}

#[tokio::test]
async fn lists_every_identified_restaurant() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (status, json) = get_json(app(dir.path()), "/api/restaurants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], json!(3));
    assert_eq!(json["restaurants"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn missing_data_directory_is_an_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let nowhere = dir.path().join("nothing-here");

    let (status, json) = get_json(app(&nowhere), "/api/restaurants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"restaurants": [], "count": 0}));

    let (_, health) = get_json(app(&nowhere), "/health").await;
    assert_eq!(health["data_directory"], json!("missing"));
}

#[tokio::test]
async fn list_filters_use_normalized_values() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (_, json) = get_json(app(dir.path()), "/api/restaurants?price_range=mid-range").await;
    assert_eq!(json["count"], json!(1));
    assert_eq!(json["restaurants"][0]["id"], json!("haifa-1"));

    let uri = "/api/restaurants?city=%D7%AA%D7%9C%20%D7%90%D7%91%D7%99%D7%91";
    let (_, json) = get_json(app(dir.path()), uri).await;
    assert_eq!(json["count"], json!(2));
}

#[tokio::test]
async fn single_restaurant_by_place_id_or_id() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (status, json) = get_json(app(dir.path()), "/api/restaurants/place-north").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name_english"], json!("North Bistro"));

    let (status, json) = get_json(app(dir.path()), "/api/restaurants/haifa-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name_hebrew"], json!("חומוס בחיפה"));

    let (status, json) = get_json(app(dir.path()), "/api/restaurants/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn search_by_name() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (_, json) = get_json(app(dir.path()), "/api/restaurants/search?q=bistro").await;
    assert_eq!(json["count"], json!(1));
    assert_eq!(json["restaurants"][0]["google_places"]["place_id"], json!("place-north"));
}

#[tokio::test]
async fn nearby_is_sorted_by_haversine_distance() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let uri = format!("/api/restaurants/nearby?lat={}&lng={}", USER.lat, USER.lng);
    let (status, json) = get_json(app(dir.path()), &uri).await;
    assert_eq!(status, StatusCode::OK);

    let expected = [
        ("place-north", GeoCoords::new(32.0880, 34.7760)),
        ("place-florentin", GeoCoords::new(32.0566, 34.7696)),
        ("haifa-1", GeoCoords::new(32.7940, 34.9896)),
    ];
    let restaurants = json["restaurants"].as_array().unwrap();
    assert_eq!(restaurants.len(), expected.len());

    for (restaurant, (id, coords)) in restaurants.iter().zip(expected) {
        let actual_id = restaurant["google_places"]["place_id"]
            .as_str()
            .or_else(|| restaurant["id"].as_str())
            .unwrap();
        assert_eq!(actual_id, id);

        let distance = restaurant["distance"].as_f64().unwrap();
        assert!((distance - haversine_distance(USER, coords)).abs() < 1e-6);
    }
}

#[tokio::test]
async fn nearby_honours_limit_and_radius() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let uri = format!("/api/restaurants/nearby?lat={}&lng={}&limit=1", USER.lat, USER.lng);
    let (_, json) = get_json(app(dir.path()), &uri).await;
    assert_eq!(json["count"], json!(1));

    let uri = format!(
        "/api/restaurants/nearby?lat={}&lng={}&max_distance_km=5",
        USER.lat, USER.lng
    );
    let (_, json) = get_json(app(dir.path()), &uri).await;
    assert_eq!(json["count"], json!(2));
}

#[tokio::test]
async fn nearby_rejects_missing_or_invalid_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (status, _) = get_json(app(dir.path()), "/api/restaurants/nearby?lat=32.0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(app(dir.path()), "/api/restaurants/nearby?lat=120&lng=34").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nearby_rejects_non_positive_or_nan_radius() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    for radius in ["NaN", "-3", "0", "inf"] {
        let uri = format!(
            "/api/restaurants/nearby?lat={}&lng={}&max_distance_km={}",
            USER.lat, USER.lng, radius
        );
        let (status, json) = get_json(app(dir.path()), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "radius {radius}");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn nearby_distance_replaces_a_stored_distance_field() {
    let dir = tempfile::tempdir().unwrap();
    write_record(
        dir.path(),
        "walk.json",
        json!({
            "id": "walk",
            "distance": "3 min walk",
            "location": {"lat": USER.lat, "lng": USER.lng}
        }),
    );

    let uri = format!("/api/restaurants/nearby?lat={}&lng={}", USER.lat, USER.lng);
    let (_, json) = get_json(app(dir.path()), &uri).await;
    assert_eq!(json["restaurants"][0]["distance"], json!(0.0));
}

#[tokio::test]
async fn map_pin_ids_resolve_to_restaurants() {
    let dir = tempfile::tempdir().unwrap();
    write_record(
        dir.path(),
        "padded.json",
        json!({
            "name_hebrew": "מסעדה",
            "google_places": {"place_id": " ChIJpad "},
            "location": {"lat": 32.07, "lng": 34.78}
        }),
    );

    let (_, map) = get_json(app(dir.path()), "/api/restaurants/map").await;
    let id = map["pins"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(id, "ChIJpad");

    let (status, json) = get_json(app(dir.path()), &format!("/api/restaurants/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name_hebrew"], json!("מסעדה"));
}

#[tokio::test]
async fn map_pins_carry_heat_colors_and_bounds() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let (status, json) = get_json(app(dir.path()), "/api/restaurants/map").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], json!(3));
    assert_eq!(json["bounds"]["max_lat"], json!(32.794));
    assert_eq!(json["date_range"]["min"], json!("2024-01-10T00:00:00Z"));

    let color_of = |id: &str| {
        json["pins"]
            .as_array()
            .unwrap()
            .iter()
            .find(|pin| pin["id"] == json!(id))
            .map(|pin| pin["heat_color"].clone())
            .unwrap()
    };
    assert_eq!(color_of("place-florentin"), json!("#2060df"));
    assert_eq!(color_of("place-north"), json!("#df2020"));
    assert_eq!(color_of("haifa-1"), json!("#9ca3af"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = get_json(app(dir.path()), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn photo_proxy_without_key_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = get_json(app(dir.path()), "/api/photos/AWU5token").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn photo_proxy_streams_new_format_references() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/places/P1/photos/F1/media"))
        .and(query_param("maxWidthPx", "400"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"png-bytes".to_vec(), "image/png"))
        .expect(1)
        .mount(&upstream)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(Some("test-key".to_string()), upstream.uri(), upstream.uri());
    let (status, body, headers) = get(
        app_with(dir.path(), proxy),
        "/api/photos/places/P1/photos/F1?maxwidth=400",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"png-bytes");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], PHOTO_CACHE_CONTROL);
}

#[tokio::test]
async fn photo_proxy_uses_legacy_endpoint_for_plain_tokens() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/photo"))
        .and(query_param("photo_reference", "AWU5token"))
        .and(query_param("maxwidth", "800"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"jpeg-bytes".to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&upstream)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(Some("test-key".to_string()), upstream.uri(), upstream.uri());
    let (status, body, _) = get(app_with(dir.path(), proxy), "/api/photos/AWU5token").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"jpeg-bytes");
}

#[tokio::test]
async fn photo_proxy_mirrors_upstream_errors() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstream)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(Some("test-key".to_string()), upstream.uri(), upstream.uri());
    let (status, _) = get_json(app_with(dir.path(), proxy), "/api/photos/AWU5token").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn photo_proxy_reports_bad_gateway_when_upstream_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(
        Some("test-key".to_string()),
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
    );
    let (status, _) = get_json(app_with(dir.path(), proxy), "/api/photos/AWU5token").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn photo_proxy_requires_a_reference() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(
        Some("test-key".to_string()),
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
    );
    let (status, _) = get_json(app_with(dir.path(), proxy), "/api/photos").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn photo_proxy_with_trailing_slash_requires_a_reference() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = PhotoProxy::new(
        Some("test-key".to_string()),
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
    );
    let (status, json) = get_json(app_with(dir.path(), proxy), "/api/photos/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}
