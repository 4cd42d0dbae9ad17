use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::helpers::geo::{haversine_distance, sort_by_distance, GeoCoords};
use crate::models::restaurant::Restaurant;
use crate::repositories::key_value_store::KeyValueStore;

pub const STORAGE_KEY: &str = "where2eat-location-filter";
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 5.0;
pub const NEARBY_LABEL: &str = "בקרבתי";
pub const LOCATION_PLACEHOLDER: &str = "בחר מיקום";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    Nearby,
    Manual,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilterState {
    pub mode: Option<LocationMode>,
    pub user_coords: Option<GeoCoords>,
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
}

impl Default for LocationFilterState {
    fn default() -> Self {
        Self {
            mode: None,
            user_coords: None,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            city: None,
            neighborhood: None,
        }
    }
}

impl LocationFilterState {
    /// Applies the restore policy to a state read back from storage.
    ///
    /// A stored nearby fix is never reused: location access has to be granted
    /// again each session, so nearby drops to no filter at all.
    fn restored(mut self) -> Self {
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            self.max_distance_km = DEFAULT_MAX_DISTANCE_KM;
        }

        match self.mode {
            Some(LocationMode::Manual) if has_text(&self.city) => {
                self.user_coords = None;
                self
            }
            _ => Self {
                max_distance_km: self.max_distance_km,
                ..Self::default()
            },
        }
    }

    pub fn display_label(&self) -> String {
        match (self.mode, self.city.as_deref(), self.neighborhood.as_deref()) {
            (Some(LocationMode::Nearby), _, _) => NEARBY_LABEL.to_string(),
            (Some(LocationMode::Manual), Some(city), Some(neighborhood))
                if !neighborhood.trim().is_empty() =>
            {
                format!("{neighborhood}, {city}")
            }
            (Some(LocationMode::Manual), Some(city), _) => city.to_string(),
            _ => LOCATION_PLACEHOLDER.to_string(),
        }
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn same_place(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// The two-mode location filter, persisted through a [`KeyValueStore`].
pub struct LocationFilter<S: KeyValueStore> {
    store: S,
    state: LocationFilterState,
}

impl<S: KeyValueStore> LocationFilter<S> {
    pub fn load(store: S) -> Self {
        let state = match store.get(STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<LocationFilterState>(&raw) {
                Ok(stored) => stored.restored(),
                Err(e) => {
                    warn!("Ignoring unreadable location filter in storage: {}", e);
                    LocationFilterState::default()
                }
            },
            None => LocationFilterState::default(),
        };

        debug!(mode = ?state.mode, "Location filter loaded");
        Self { store, state }
    }

    pub fn state(&self) -> &LocationFilterState {
        &self.state
    }

    pub fn set_nearby_mode(&mut self, coords: GeoCoords) {
        self.state = LocationFilterState {
            mode: Some(LocationMode::Nearby),
            user_coords: Some(coords),
            max_distance_km: self.state.max_distance_km,
            city: None,
            neighborhood: None,
        };
        self.persist();
    }

    pub fn set_manual_mode(&mut self, city: impl Into<String>, neighborhood: Option<String>) {
        self.state = LocationFilterState {
            mode: Some(LocationMode::Manual),
            user_coords: None,
            max_distance_km: self.state.max_distance_km,
            city: Some(city.into()),
            neighborhood: neighborhood.filter(|n| !n.trim().is_empty()),
        };
        self.persist();
    }

    /// Returns `false` and leaves the state alone for non-positive or
    /// non-finite distances.
    pub fn set_max_distance(&mut self, max_distance_km: f64) -> bool {
        if !max_distance_km.is_finite() || max_distance_km <= 0.0 {
            return false;
        }
        self.state.max_distance_km = max_distance_km;
        self.persist();
        true
    }

    pub fn clear_location(&mut self) {
        self.state = LocationFilterState::default();
        if let Err(e) = self.store.clear(STORAGE_KEY) {
            warn!("Failed to clear stored location filter: {}", e);
        }
    }

    pub fn display_label(&self) -> String {
        self.state.display_label()
    }

    /// Narrows `restaurants` to the active filter.
    ///
    /// Nearby keeps located restaurants within `max_distance_km`, closest
    /// first. Manual keeps restaurants in the chosen city (and neighborhood).
    /// No filter keeps everything in input order.
    pub fn apply<'a>(&self, restaurants: &'a [Restaurant]) -> Vec<&'a Restaurant> {
        match (self.state.mode, self.state.user_coords) {
            (Some(LocationMode::Nearby), Some(origin)) => {
                sort_by_distance(restaurants, origin, Restaurant::coords)
                    .into_iter()
                    .filter(|located| located.distance <= self.state.max_distance_km)
                    .map(|located| located.item)
                    .collect()
            }
            (Some(LocationMode::Manual), _) => restaurants
                .iter()
                .filter(|restaurant| self.matches_manual(restaurant))
                .collect(),
            _ => restaurants.iter().collect(),
        }
    }

    /// Distance from the user's fix, only meaningful in nearby mode.
    pub fn distance_to(&self, restaurant: &Restaurant) -> Option<f64> {
        match self.state.mode {
            Some(LocationMode::Nearby) => {
                Some(haversine_distance(self.state.user_coords?, restaurant.coords()?))
            }
            _ => None,
        }
    }

    fn matches_manual(&self, restaurant: &Restaurant) -> bool {
        let Some(city) = self.state.city.as_deref() else {
            return true;
        };
        let city_matches = restaurant
            .location
            .city
            .as_deref()
            .is_some_and(|candidate| same_place(candidate, city));
        let neighborhood_matches = match self.state.neighborhood.as_deref() {
            Some(wanted) => restaurant
                .location
                .neighborhood
                .as_deref()
                .is_some_and(|candidate| same_place(candidate, wanted)),
            None => true,
        };
        city_matches && neighborhood_matches
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.state) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!("Failed to serialize location filter: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(STORAGE_KEY, &serialized) {
            warn!("Failed to persist location filter: {}", e);
        }
    }
}
