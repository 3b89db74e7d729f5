pub mod catalog;
pub mod composite;
pub mod relational;
pub mod remote;

#[cfg(test)]
pub(crate) mod fixtures;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::StorageError;
use crate::models::Event;

pub use composite::CompositeEventSource;
pub use relational::RelationalEventSource;
pub use remote::{CatalogError, RemoteCatalogSource};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A place events can be looked up in.
///
/// A missing id is `Ok(None)`, never an error. List lookups return at most
/// `limit` events when a limit is given.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_by_event_id(&self, id: &str) -> Result<Option<Event>, SourceError>;

    async fn find_by_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError>;

    async fn find_by_keyword(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError>;

    async fn find_excluding_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError>;
}

pub(crate) fn truncate_to<T>(items: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}
