use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use super::{truncate_to, EventSource, SourceError};
use crate::data_source::DataSource;
use crate::db::EventDetails;
use crate::models::{Event, EventOrigin, Genre, Image};

/// Events from the application's own relational store.
pub struct RelationalEventSource {
    data: Arc<dyn DataSource>,
}

impl RelationalEventSource {
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }

    /// Events owned by `organizer_id`. Organizer events only exist here.
    pub async fn find_by_organizer(
        &self,
        organizer_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let ids = self.data.get_event_ids_by_organizer(organizer_id).await?;
        self.hydrate(ids, limit).await
    }

    async fn load(&self, id: i64) -> Result<Option<Event>, SourceError> {
        let Some(details) = self.data.get_event_details(id).await? else {
            return Ok(None);
        };
        let (genres, images) = tokio::try_join!(
            self.data.get_event_genres(id),
            self.data.get_event_images(id)
        )?;
        Ok(Some(assemble(id, details, genres, images)))
    }

    /// Turns candidate ids into events, keeping the candidate order.
    /// The list is cut to `limit` first; ids that no longer resolve are dropped.
    async fn hydrate(
        &self,
        mut ids: Vec<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        truncate_to(&mut ids, limit);
        let loaded = try_join_all(ids.iter().map(|&id| self.load(id))).await?;

        let requested = loaded.len();
        let events: Vec<Event> = loaded.into_iter().flatten().collect();
        if events.len() < requested {
            tracing::warn!(
                requested,
                resolved = events.len(),
                "candidate event ids vanished before hydration"
            );
        }
        Ok(events)
    }
}

fn assemble(id: i64, details: EventDetails, genres: Vec<Genre>, images: Vec<Image>) -> Event {
    let mut event = Event::new(id, EventOrigin::Relational, details.name)
        .with_description(details.description)
        .with_location(details.location)
        .with_dates(details.dates);
    for range in details.price_ranges {
        event.set_price_range(range);
    }
    for genre in genres {
        event.add_genre(genre);
    }
    for image in images {
        event.add_image(image);
    }
    event
}

#[async_trait]
impl EventSource for RelationalEventSource {
    fn name(&self) -> &'static str {
        EventOrigin::Relational.as_str()
    }

    async fn find_by_event_id(&self, id: &str) -> Result<Option<Event>, SourceError> {
        match id.trim().parse::<i64>() {
            Ok(id) => self.load(id).await,
            Err(_) => {
                tracing::debug!(id, "not a relational event id");
                Ok(None)
            }
        }
    }

    async fn find_by_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let ids = self.data.get_event_ids_with_genres(names).await?;
        self.hydrate(ids, limit).await
    }

    async fn find_by_keyword(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.data.get_event_ids_with_keyword(text).await?;
        self.hydrate(ids, limit).await
    }

    async fn find_excluding_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let ids = self.data.get_event_ids_excluding_genres(names).await?;
        self.hydrate(ids, limit).await
    }
}
