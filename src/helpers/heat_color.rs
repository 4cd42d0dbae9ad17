use serde::Serialize;
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::models::restaurant::Restaurant;

/// Colour used for markers whose publish date is missing or unreadable.
pub const NEUTRAL_GRAY: &str = "#9ca3af";

const COLDEST_HUE: f64 = 220.0;
const SATURATION: f64 = 0.75;
const LIGHTNESS: f64 = 0.5;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");
const DATETIME_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct DateRange {
    #[serde(with = "time::serde::rfc3339")]
    pub min: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub max: OffsetDateTime,
}

/// Maps a recency ratio onto a blue (0.0, oldest) to red (1.0, newest) hue.
pub fn ratio_to_heat_color(ratio: f64) -> String {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let hue = COLDEST_HUE - COLDEST_HUE * ratio;
    hsl_to_hex(hue, SATURATION, LIGHTNESS)
}

pub fn date_to_heat_color(date: Option<&str>, min: OffsetDateTime, max: OffsetDateTime) -> String {
    let Some(date) = date.and_then(parse_timestamp) else {
        return NEUTRAL_GRAY.to_string();
    };

    if min == max {
        return ratio_to_heat_color(1.0);
    }

    let ratio = (date - min).as_seconds_f64() / (max - min).as_seconds_f64();
    ratio_to_heat_color(ratio)
}

/// Earliest and latest valid date across `items`, or `None` if there are none.
pub fn date_range<T, F>(items: &[T], extract: F) -> Option<DateRange>
where
    F: Fn(&T) -> Option<&str>,
{
    items
        .iter()
        .filter_map(|item| extract(item).and_then(parse_timestamp))
        .fold(None, |range, date| match range {
            None => Some(DateRange { min: date, max: date }),
            Some(DateRange { min, max }) => Some(DateRange {
                min: min.min(date),
                max: max.max(date),
            }),
        })
}

pub fn restaurant_date_range(restaurants: &[Restaurant]) -> Option<DateRange> {
    date_range(restaurants, |restaurant| restaurant.published_at())
}

/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a plain
/// `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp);
    }
    if let Ok(timestamp) = PrimitiveDateTime::parse(raw, DATETIME_FORMAT) {
        return Some(timestamp.assume_utc());
    }
    Date::parse(raw, DATE_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let a = saturation * lightness.min(1.0 - lightness);
    let channel = |n: f64| -> u8 {
        let k = (n + hue / 30.0) % 12.0;
        let value = lightness - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (value * 255.0).round() as u8
    };

    format!("#{:02x}{:02x}{:02x}", channel(0.0), channel(8.0), channel(4.0))
}
