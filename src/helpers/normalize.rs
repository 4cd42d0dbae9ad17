use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_RECOMMENDATION: &str = "mentioned";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PriceRange {
    Budget,
    MidRange,
    Expensive,
}

impl PriceRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRange::Budget => "budget",
            PriceRange::MidRange => "mid-range",
            PriceRange::Expensive => "expensive",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PriceRange::Budget => "₪",
            PriceRange::MidRange => "₪₪",
            PriceRange::Expensive => "₪₪₪",
        }
    }
}

const PRICE_RANGE_TABLE: &[(&str, PriceRange)] = &[
    ("budget", PriceRange::Budget),
    ("cheap", PriceRange::Budget),
    ("זול", PriceRange::Budget),
    ("תקציבי", PriceRange::Budget),
    ("mid-range", PriceRange::MidRange),
    ("moderate", PriceRange::MidRange),
    ("בינוני", PriceRange::MidRange),
    ("ממוצע", PriceRange::MidRange),
    ("expensive", PriceRange::Expensive),
    ("יקר", PriceRange::Expensive),
    ("בינוני-יקר", PriceRange::Expensive),
    ("יוקרתי", PriceRange::Expensive),
];

const STATUS_TABLE: &[(&str, &str)] = &[
    ("open", "open"),
    ("פתוח", "open"),
    ("closed", "closed"),
    ("סגור", "closed"),
    ("נסגר", "closed"),
    ("temporarily_closed", "temporarily_closed"),
    ("סגור זמנית", "temporarily_closed"),
    ("new_opening", "new_opening"),
    ("חדש", "new_opening"),
    ("נפתח לאחרונה", "new_opening"),
];

const HOST_OPINION_TABLE: &[(&str, &str)] = &[
    ("positive", "positive"),
    ("חיובית", "positive"),
    ("חיובי", "positive"),
    ("ממליץ", "positive"),
    ("negative", "negative"),
    ("שלילית", "negative"),
    ("שלילי", "negative"),
    ("לא ממליץ", "negative"),
    ("mixed", "mixed"),
    ("מעורבת", "mixed"),
    ("מעורב", "mixed"),
    ("neutral", "neutral"),
    ("ניטרלית", "neutral"),
    ("ניטרלי", "neutral"),
];

fn lookup<T: Copy>(table: &[(&str, T)], raw: &str) -> Option<T> {
    let key = raw.trim().to_lowercase();
    table
        .iter()
        .find(|(phrase, _)| *phrase == key)
        .map(|(_, canonical)| *canonical)
}

/// Only values from the table are recognised; anything else is `None`.
pub fn normalize_price_range(raw: Option<&str>) -> Option<PriceRange> {
    raw.and_then(|value| lookup(PRICE_RANGE_TABLE, value))
}

/// Unknown statuses pass through untouched.
pub fn normalize_status(raw: &str) -> Cow<'_, str> {
    match lookup(STATUS_TABLE, raw) {
        Some(canonical) => Cow::Borrowed(canonical),
        None => Cow::Borrowed(raw),
    }
}

/// Unknown opinions pass through untouched.
pub fn normalize_host_opinion(raw: &str) -> Cow<'_, str> {
    match lookup(HOST_OPINION_TABLE, raw) {
        Some(canonical) => Cow::Borrowed(canonical),
        None => Cow::Borrowed(raw),
    }
}

pub fn get_price_display(raw: Option<&str>) -> &'static str {
    normalize_price_range(raw).map_or("", |price| price.symbol())
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MenuItem {
    pub item_name: String,
    pub description: String,
    pub price: Option<String>,
    pub recommendation_level: String,
}

impl MenuItem {
    fn named(item_name: &str) -> Self {
        Self {
            item_name: item_name.trim().to_string(),
            description: String::new(),
            price: None,
            recommendation_level: DEFAULT_RECOMMENDATION.to_string(),
        }
    }
}

/// Coerces the extraction pipeline's menu entries, which are either plain
/// strings or partially filled objects, into [`MenuItem`]s.
///
/// Entries that are neither are dropped.
pub fn normalize_menu_items(values: &[Value]) -> Vec<MenuItem> {
    values.iter().filter_map(normalize_menu_item).collect()
}

fn normalize_menu_item(value: &Value) -> Option<MenuItem> {
    match value {
        Value::String(name) => Some(MenuItem::named(name)),
        Value::Object(fields) => {
            let text = |key: &str| {
                fields
                    .get(key)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
            };

            let price = match fields.get("price") {
                Some(Value::String(price)) if !price.trim().is_empty() => {
                    Some(price.trim().to_string())
                }
                Some(Value::Number(price)) => Some(price.to_string()),
                _ => None,
            };

            Some(MenuItem {
                item_name: text("item_name").or_else(|| text("name")).unwrap_or_default(),
                description: text("description").unwrap_or_default(),
                price,
                recommendation_level: text("recommendation_level")
                    .filter(|level| !level.is_empty())
                    .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
            })
        }
        _ => None,
    }
}
