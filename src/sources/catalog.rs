//! Catalog (Discovery API style) response shapes and their mapping onto
//! the canonical [`Event`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{Event, EventDates, EventOrigin, Genre, Image, PriceRange};

const LOCATION_SEPARATOR: &str = "─";

#[derive(Debug, Default, Deserialize)]
pub struct CatalogResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<CatalogEmbedded>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogEmbedded {
    events: Option<Vec<RawEvent>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub info: Option<String>,
    pub please_note: Option<String>,
    pub dates: Option<RawDates>,
    #[serde(default)]
    pub price_ranges: Vec<RawPriceRange>,
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub classifications: Vec<RawClassification>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<RawEventEmbedded>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDates {
    pub start: Option<RawDate>,
    pub end: Option<RawDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDate {
    pub date_time: Option<String>,
    pub local_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPriceRange {
    pub currency: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    pub ratio: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClassification {
    pub segment: Option<RawNamed>,
    pub genre: Option<RawNamed>,
    pub sub_genre: Option<RawNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNamed {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEventEmbedded {
    #[serde(default)]
    pub venues: Vec<RawVenue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVenue {
    pub name: Option<String>,
    pub city: Option<RawNamed>,
    pub state: Option<RawState>,
    pub country: Option<RawCountry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawState {
    pub state_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCountry {
    pub country_code: Option<String>,
}

impl CatalogResponse {
    /// Raw events in response order; a missing `_embedded` or `events` is an empty page.
    pub fn into_raw_events(self) -> Vec<RawEvent> {
        self.embedded
            .and_then(|embedded| embedded.events)
            .unwrap_or_default()
    }
}

/// Cuts `raw` to `limit` and only then maps what is left.
pub fn map_limited<F>(mut raw: Vec<RawEvent>, limit: Option<usize>, map: F) -> Vec<Event>
where
    F: FnMut(RawEvent) -> Event,
{
    if let Some(limit) = limit {
        raw.truncate(limit);
    }
    raw.into_iter().map(map).collect()
}

pub fn to_event(raw: RawEvent) -> Event {
    let description = description(&raw);
    let location = raw
        .embedded
        .as_ref()
        .and_then(|embedded| embedded.venues.first())
        .map(format_location);
    let dates = raw.dates.as_ref().map(normalize_dates).unwrap_or_default();

    let mut event = Event::new(raw.id, EventOrigin::Remote, raw.name)
        .with_description(description)
        .with_location(location)
        .with_dates(dates);

    for range in raw.price_ranges {
        let (min, max) = match (range.min, range.max) {
            (Some(min), Some(max)) => (min, max),
            (Some(only), None) | (None, Some(only)) => (only, only),
            (None, None) => continue,
        };
        event.set_price_range(PriceRange::new(range.currency, min, max));
    }

    for classification in &raw.classifications {
        let levels = [
            &classification.segment,
            &classification.genre,
            &classification.sub_genre,
        ];
        for level in levels.into_iter().flatten() {
            if let Some(genre) = to_genre(level) {
                event.add_genre(genre);
            }
        }
    }

    for image in raw.images {
        event.add_image(Image {
            ratio: image.ratio,
            width: image.width,
            height: image.height,
            url: image.url,
        });
    }

    event
}

fn description(raw: &RawEvent) -> Option<String> {
    [&raw.description, &raw.info, &raw.please_note]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .cloned()
}

fn format_location(venue: &RawVenue) -> String {
    let name = venue.name.as_deref().unwrap_or_default();
    let city = venue
        .city
        .as_ref()
        .and_then(|city| city.name.as_deref())
        .unwrap_or_default();
    let region = venue
        .state
        .as_ref()
        .and_then(|state| state.state_code.as_deref())
        .or_else(|| {
            venue
                .country
                .as_ref()
                .and_then(|country| country.country_code.as_deref())
        })
        .unwrap_or_default();
    format!("{name} {LOCATION_SEPARATOR} {city}, {region}")
}

fn normalize_dates(dates: &RawDates) -> EventDates {
    EventDates {
        start_date_time: dates.start.as_ref().and_then(resolve_date),
        end_date_time: dates.end.as_ref().and_then(resolve_date),
    }
}

/// Exact timestamp if it parses, otherwise midnight UTC of the date-only field.
fn resolve_date(date: &RawDate) -> Option<DateTime<Utc>> {
    let exact = date
        .date_time
        .as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc));
    exact.or_else(|| {
        date.local_date
            .as_deref()
            .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc())
    })
}

fn to_genre(level: &RawNamed) -> Option<Genre> {
    let name = level.name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(Genre {
        id: None,
        external_id: level.id.clone(),
        name: name.to_string(),
    })
}
