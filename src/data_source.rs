//! Storage capabilities the relational event source consumes.

use async_trait::async_trait;

use crate::db::{ConnectionPool, EventDetails, NewEvent, StorageError};
use crate::models::{Genre, Image};

/// Read access to the relational event store.
///
/// Implementations decide the query semantics; callers only rely on the
/// id lists coming back in a stable order.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_event_details(&self, id: i64) -> Result<Option<EventDetails>, StorageError>;

    async fn get_event_genres(&self, id: i64) -> Result<Vec<Genre>, StorageError>;

    async fn get_event_images(&self, id: i64) -> Result<Vec<Image>, StorageError>;

    async fn get_event_ids_with_genres(&self, names: &[String]) -> Result<Vec<i64>, StorageError>;

    async fn get_event_ids_with_keyword(&self, text: &str) -> Result<Vec<i64>, StorageError>;

    async fn get_event_ids_excluding_genres(
        &self,
        names: &[String],
    ) -> Result<Vec<i64>, StorageError>;

    async fn get_event_ids_by_organizer(&self, organizer_id: i64)
        -> Result<Vec<i64>, StorageError>;
}

/// [`DataSource`] backed by a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteDataSource {
    pool: ConnectionPool,
}

impl SqliteDataSource {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub async fn insert_event(&self, event: NewEvent) -> Result<i64, StorageError> {
        self.pool
            .with_store(move |store| store.insert_event(&event))
            .await
    }

    pub async fn seed_if_empty(&self) -> Result<usize, StorageError> {
        self.pool.with_store(|store| store.seed_if_empty()).await
    }
}

#[async_trait]
impl DataSource for SqliteDataSource {
    async fn get_event_details(&self, id: i64) -> Result<Option<EventDetails>, StorageError> {
        self.pool
            .with_store(move |store| store.get_event_details(id))
            .await
    }

    async fn get_event_genres(&self, id: i64) -> Result<Vec<Genre>, StorageError> {
        self.pool
            .with_store(move |store| store.get_event_genres(id))
            .await
    }

    async fn get_event_images(&self, id: i64) -> Result<Vec<Image>, StorageError> {
        self.pool
            .with_store(move |store| store.get_event_images(id))
            .await
    }

    async fn get_event_ids_with_genres(&self, names: &[String]) -> Result<Vec<i64>, StorageError> {
        let names = names.to_vec();
        self.pool
            .with_store(move |store| store.get_event_ids_with_genres(&names))
            .await
    }

    async fn get_event_ids_with_keyword(&self, text: &str) -> Result<Vec<i64>, StorageError> {
        let text = text.to_string();
        self.pool
            .with_store(move |store| store.get_event_ids_with_keyword(&text))
            .await
    }

    async fn get_event_ids_excluding_genres(
        &self,
        names: &[String],
    ) -> Result<Vec<i64>, StorageError> {
        let names = names.to_vec();
        self.pool
            .with_store(move |store| store.get_event_ids_excluding_genres(&names))
            .await
    }

    async fn get_event_ids_by_organizer(
        &self,
        organizer_id: i64,
    ) -> Result<Vec<i64>, StorageError> {
        self.pool
            .with_store(move |store| store.get_event_ids_by_organizer(organizer_id))
            .await
    }
}
