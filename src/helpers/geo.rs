use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct GeoCoords {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An item paired with its distance in kilometres from some reference point.
///
/// `item` is flattened, so a `distance` key of its own is replaced by the
/// computed one when serialized to a JSON value.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct WithDistance<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Great-circle distance in kilometres.
///
/// Never fails: malformed coordinates (NaN, infinities) produce NaN, so callers
/// that care must check [`GeoCoords::is_valid`] first.
pub fn haversine_distance(a: GeoCoords, b: GeoCoords) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn is_within_radius(a: GeoCoords, b: GeoCoords, radius_km: f64) -> bool {
    haversine_distance(a, b) <= radius_km
}

/// Sorts `items` by ascending distance from `origin`.
///
/// Items for which `extract` returns `None` are dropped. Equal distances keep
/// their input order.
pub fn sort_by_distance<'a, T, F>(
    items: &'a [T],
    origin: GeoCoords,
    extract: F,
) -> Vec<WithDistance<&'a T>>
where
    F: Fn(&T) -> Option<GeoCoords>,
{
    let mut located: Vec<WithDistance<&'a T>> = items
        .iter()
        .filter_map(|item| {
            extract(item).map(|coords| WithDistance {
                item,
                distance: haversine_distance(origin, coords),
            })
        })
        .collect();

    // Vec::sort_by is stable, which is what keeps ties in input order.
    located.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    located
}

pub fn get_n_closest<'a, T, F>(
    items: &'a [T],
    origin: GeoCoords,
    n: usize,
    extract: F,
) -> Vec<WithDistance<&'a T>>
where
    F: Fn(&T) -> Option<GeoCoords>,
{
    let mut sorted = sort_by_distance(items, origin, extract);
    sorted.truncate(n);
    sorted
}

/// Axis-aligned box around `points`, used to fit a map viewport.
pub fn bounds_for_points(points: &[GeoCoords]) -> Option<Bounds> {
    let first = points.first()?;
    let initial = Bounds {
        min_lat: first.lat,
        max_lat: first.lat,
        min_lng: first.lng,
        max_lng: first.lng,
    };

    Some(points.iter().skip(1).fold(initial, |bounds, point| Bounds {
        min_lat: bounds.min_lat.min(point.lat),
        max_lat: bounds.max_lat.max(point.lat),
        min_lng: bounds.min_lng.min(point.lng),
        max_lng: bounds.max_lng.max(point.lng),
    }))
}
