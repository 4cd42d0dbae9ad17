use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull};

use crate::helpers::geo::GeoCoords;
use crate::helpers::normalize::{
    normalize_host_opinion, normalize_menu_items, normalize_price_range, normalize_status,
    MenuItem,
};

/// A restaurant record as written by the transcript extraction pipeline.
///
/// Fields this service does not model are kept in `extra` so records survive
/// a read/serialize round trip unchanged.
#[serde_as]
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Restaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name_hebrew: Option<String>,
    #[serde(default)]
    pub name_english: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub host_opinion: Option<String>,
    #[serde(default)]
    pub host_comments: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub location: Location,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub menu_items: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub episode_info: EpisodeInfo,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub google_places: GooglePlaces,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[serde_as]
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Photo {
    pub photo_reference: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct EpisodeInfo {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[serde_as]
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct GooglePlaces {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub google_name: Option<String>,
    #[serde(default)]
    pub google_url: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub rating: Option<f64>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl Restaurant {
    /// The Google place id, or the record's own `id` when there is no place id.
    ///
    /// Records with neither have no stable identity and are rejected by the
    /// store.
    pub fn stable_id(&self) -> Option<&str> {
        non_blank(&self.google_places.place_id).or_else(|| non_blank(&self.id))
    }

    /// True when `id` is this record's place id or its own id, ignoring
    /// surrounding whitespace on either side.
    pub fn has_id(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty()
            && (non_blank(&self.google_places.place_id) == Some(id)
                || non_blank(&self.id) == Some(id))
    }

    pub fn display_name(&self) -> &str {
        non_blank(&self.name_hebrew)
            .or_else(|| non_blank(&self.name_english))
            .unwrap_or_default()
    }

    pub fn coords(&self) -> Option<GeoCoords> {
        let coords = GeoCoords::new(self.location.lat?, self.location.lng?);
        coords.is_valid().then_some(coords)
    }

    pub fn published_at(&self) -> Option<&str> {
        non_blank(&self.episode_info.published_at)
    }

    pub fn menu(&self) -> Vec<MenuItem> {
        normalize_menu_items(&self.menu_items)
    }

    /// Rewrites legacy Hebrew enum values to their canonical English tokens.
    ///
    /// Unrecognised price ranges are left as they are rather than erased.
    pub fn normalized(mut self) -> Self {
        if let Some(price) = normalize_price_range(self.price_range.as_deref()) {
            self.price_range = Some(price.as_str().to_string());
        }
        self.status = self
            .status
            .map(|status| normalize_status(&status).into_owned());
        self.host_opinion = self
            .host_opinion
            .map(|opinion| normalize_host_opinion(&opinion).into_owned());
        self.menu_items = self
            .menu()
            .into_iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect();
        self
    }

    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }

        [&self.name_hebrew, &self.name_english, &self.cuisine_type]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
