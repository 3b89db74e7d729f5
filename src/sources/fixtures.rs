//! In-memory stand-ins for storage and event sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{truncate_to, CatalogError, EventSource, SourceError};
use crate::data_source::DataSource;
use crate::db::{EventDetails, StorageError};
use crate::models::{Event, EventDates, EventOrigin, Genre, Image, PriceRange};

pub fn event(id: &str, origin: EventOrigin, name: &str) -> Event {
    Event::new(id, origin, name)
}

#[derive(Default)]
pub struct FakeDataSource {
    details: HashMap<i64, EventDetails>,
    genres: HashMap<i64, Vec<Genre>>,
    images: HashMap<i64, Vec<Image>>,
    genre_ids: Vec<i64>,
    keyword_ids: Vec<i64>,
    excluding_ids: Vec<i64>,
    organizer_ids: HashMap<i64, Vec<i64>>,
    delays: HashMap<i64, Duration>,
    association_delay: Option<Duration>,
    failing: bool,
    failing_genres: bool,
    details_calls: AtomicUsize,
    associations_in_flight: AtomicUsize,
    peak_associations: AtomicUsize,
}

impl FakeDataSource {
    pub fn with_event(mut self, id: i64, name: &str) -> Self {
        self.details.insert(
            id,
            EventDetails {
                name: name.to_string(),
                description: None,
                location: None,
                dates: EventDates::default(),
                price_ranges: Vec::new(),
            },
        );
        self
    }

    pub fn with_genres(mut self, id: i64, names: &[&str]) -> Self {
        self.genres
            .entry(id)
            .or_default()
            .extend(names.iter().map(|name| Genre::named(*name)));
        self
    }

    pub fn with_image(mut self, id: i64, url: &str) -> Self {
        self.images.entry(id).or_default().push(Image {
            ratio: None,
            width: None,
            height: None,
            url: url.to_string(),
        });
        self
    }

    pub fn with_price_ranges(mut self, id: i64, ranges: Vec<PriceRange>) -> Self {
        if let Some(details) = self.details.get_mut(&id) {
            details.price_ranges = ranges;
        }
        self
    }

    pub fn with_delay(mut self, id: i64, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    pub fn with_genre_ids(mut self, ids: Vec<i64>) -> Self {
        self.genre_ids = ids;
        self
    }

    pub fn with_keyword_ids(mut self, ids: Vec<i64>) -> Self {
        self.keyword_ids = ids;
        self
    }

    pub fn with_excluding_ids(mut self, ids: Vec<i64>) -> Self {
        self.excluding_ids = ids;
        self
    }

    pub fn with_organizer(mut self, organizer_id: i64, ids: Vec<i64>) -> Self {
        self.organizer_ids.insert(organizer_id, ids);
        self
    }

    /// Delays every genre and image lookup by `delay`.
    pub fn with_association_delay(mut self, delay: Duration) -> Self {
        self.association_delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn failing_genres(mut self) -> Self {
        self.failing_genres = true;
        self
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    /// Most genre/image lookups that were running at the same time.
    pub fn peak_associations(&self) -> usize {
        self.peak_associations.load(Ordering::SeqCst)
    }

    async fn association<T>(&self, value: T) -> T {
        let running = self.associations_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_associations.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.association_delay {
            tokio::time::sleep(delay).await;
        }
        self.associations_in_flight.fetch_sub(1, Ordering::SeqCst);
        value
    }
}

#[async_trait]
impl DataSource for FakeDataSource {
    async fn get_event_details(&self, id: i64) -> Result<Option<EventDetails>, StorageError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing {
            return Err(StorageError::Task("database unavailable".to_string()));
        }
        Ok(self.details.get(&id).cloned())
    }

    async fn get_event_genres(&self, id: i64) -> Result<Vec<Genre>, StorageError> {
        let genres = self
            .association(self.genres.get(&id).cloned().unwrap_or_default())
            .await;
        if self.failing_genres {
            return Err(StorageError::Task("genre query failed".to_string()));
        }
        Ok(genres)
    }

    async fn get_event_images(&self, id: i64) -> Result<Vec<Image>, StorageError> {
        Ok(self
            .association(self.images.get(&id).cloned().unwrap_or_default())
            .await)
    }

    async fn get_event_ids_with_genres(&self, _names: &[String]) -> Result<Vec<i64>, StorageError> {
        Ok(self.genre_ids.clone())
    }

    async fn get_event_ids_with_keyword(&self, _text: &str) -> Result<Vec<i64>, StorageError> {
        Ok(self.keyword_ids.clone())
    }

    async fn get_event_ids_excluding_genres(
        &self,
        _names: &[String],
    ) -> Result<Vec<i64>, StorageError> {
        Ok(self.excluding_ids.clone())
    }

    async fn get_event_ids_by_organizer(
        &self,
        organizer_id: i64,
    ) -> Result<Vec<i64>, StorageError> {
        Ok(self
            .organizer_ids
            .get(&organizer_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Event source returning canned results and recording every call.
pub struct StaticSource {
    name: &'static str,
    by_id: HashMap<String, Event>,
    genre_results: Vec<Event>,
    keyword_results: Vec<Event>,
    excluding_results: Vec<Event>,
    delay: Option<Duration>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            by_id: HashMap::new(),
            genre_results: Vec::new(),
            keyword_results: Vec::new(),
            excluding_results: Vec::new(),
            delay: None,
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.by_id.insert(event.id.to_string(), event);
        self
    }

    pub fn with_genre_results(mut self, events: Vec<Event>) -> Self {
        self.genre_results = events;
        self
    }

    pub fn with_keyword_results(mut self, events: Vec<Event>) -> Self {
        self.keyword_results = events;
        self
    }

    pub fn with_excluding_results(mut self, events: Vec<Event>) -> Self {
        self.excluding_results = events;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    async fn answer<T: Send>(&self, call: String, value: T) -> Result<T, SourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(CatalogError::Http("catalog unreachable".to_string()).into());
        }
        Ok(value)
    }
}

#[async_trait]
impl EventSource for StaticSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn find_by_event_id(&self, id: &str) -> Result<Option<Event>, SourceError> {
        self.answer(format!("id:{id}"), self.by_id.get(id).cloned())
            .await
    }

    async fn find_by_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let mut events = self.genre_results.clone();
        truncate_to(&mut events, limit);
        self.answer(format!("genre:{}", names.join(",")), events).await
    }

    async fn find_by_keyword(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let mut events = self.keyword_results.clone();
        truncate_to(&mut events, limit);
        self.answer(format!("keyword:{text}"), events).await
    }

    async fn find_excluding_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let mut events = self.excluding_results.clone();
        truncate_to(&mut events, limit);
        self.answer(format!("excluding:{}", names.join(",")), events)
            .await
    }
}
