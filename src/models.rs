use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_LOCATION: &str = "No location available";

/// Where an [`Event`] was assembled from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Relational,
    Remote,
}

impl EventOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            EventOrigin::Relational => "relational",
            EventOrigin::Remote => "remote",
        }
    }
}

/// Event identifier. Only unique within one origin: the relational store
/// hands out numbers, the remote catalog opaque strings.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum EventId {
    Numeric(i64),
    Opaque(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Numeric(id) => write!(f, "{id}"),
            EventId::Opaque(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        EventId::Numeric(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        EventId::Opaque(id)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        EventId::Opaque(id.to_string())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDates {
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PriceRange {
    pub currency: String,
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(currency: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            currency: currency.into(),
            min,
            max,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Image {
    pub ratio: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: Option<i64>,
    pub external_id: Option<String>,
    pub name: String,
}

impl Genre {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            external_id: None,
            name: name.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// Canonical, source-agnostic event.
///
/// Built fresh for every query. The collection fields are private so the
/// one-range-per-currency and no-duplicate-genre rules hold for every
/// value handed to callers.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub source: EventOrigin,
    pub name: String,
    pub description: String,
    pub location: String,
    pub dates: EventDates,
    price_ranges: Vec<PriceRange>,
    images: Vec<Image>,
    genres: Vec<Genre>,
}

impl Event {
    pub fn new(id: impl Into<EventId>, source: EventOrigin, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            name: name.into(),
            description: NO_DESCRIPTION.to_string(),
            location: NO_LOCATION.to_string(),
            dates: EventDates::default(),
            price_ranges: Vec::new(),
            images: Vec::new(),
            genres: Vec::new(),
        }
    }

    /// Sets the description, keeping the sentinel for missing or blank input.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        if let Some(text) = non_blank(description) {
            self.description = text;
        }
        self
    }

    /// Sets the location, keeping the sentinel for missing or blank input.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        if let Some(text) = non_blank(location) {
            self.location = text;
        }
        self
    }

    pub fn with_dates(mut self, dates: EventDates) -> Self {
        self.dates = dates;
        self
    }

    pub fn price_ranges(&self) -> &[PriceRange] {
        &self.price_ranges
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn has_genre(&self, name: &str) -> bool {
        self.genres.iter().any(|genre| genre.matches(name))
    }

    /// Folds `range` into the entry for its currency, widening it to the
    /// smallest min and largest max seen. New currencies are appended, so
    /// the list keeps first-seen currency order.
    pub fn set_price_range(&mut self, range: PriceRange) {
        match self
            .price_ranges
            .iter_mut()
            .find(|existing| existing.currency == range.currency)
        {
            Some(existing) => {
                existing.min = existing.min.min(range.min);
                existing.max = existing.max.max(range.max);
            }
            None => self.price_ranges.push(range),
        }
    }

    /// Appends `image` unless one with the same url is already attached.
    /// Returns whether the image was added.
    pub fn add_image(&mut self, image: Image) -> bool {
        if self.images.iter().any(|existing| existing.url == image.url) {
            return false;
        }
        self.images.push(image);
        true
    }

    pub fn remove_image(&mut self, url: &str) -> Option<Image> {
        let index = self.images.iter().position(|image| image.url == url)?;
        Some(self.images.remove(index))
    }

    /// Appends `genre` unless one with the exact same name is already attached.
    /// Returns whether the genre was added.
    pub fn add_genre(&mut self, genre: Genre) -> bool {
        if self.genres.iter().any(|existing| existing.name == genre.name) {
            return false;
        }
        self.genres.push(genre);
        true
    }

    pub fn remove_genre(&mut self, name: &str) -> Option<Genre> {
        let index = self.genres.iter().position(|genre| genre.matches(name))?;
        Some(self.genres.remove(index))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
