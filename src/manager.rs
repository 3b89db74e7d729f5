use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::data_source::SqliteDataSource;
use crate::db::ConnectionPool;
use crate::models::Event;
use crate::sources::{
    CompositeEventSource, EventSource, RelationalEventSource, RemoteCatalogSource, SourceError,
};
use crate::utils;

/// Which source a search runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Relational,
    Remote,
    #[default]
    Composite,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Relational => "relational",
            SourceKind::Remote => "remote",
            SourceKind::Composite => "composite",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown event source: {0}")]
pub struct UnknownSource(String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relational" => Ok(SourceKind::Relational),
            "remote" => Ok(SourceKind::Remote),
            "composite" => Ok(SourceKind::Composite),
            _ => Err(UnknownSource(value.to_string())),
        }
    }
}

/// A search as route handlers receive it.
///
/// `classification` and `segment` are comma-separated genre names. Every
/// field that is set runs its own lookup; see [`EventManager::search`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub source: SourceKind,
    pub event_id: Option<String>,
    pub classification: Option<String>,
    pub segment: Option<String>,
    pub organizer_id: Option<i64>,
    pub keyword: Option<String>,
    pub limit: Option<usize>,
}

pub struct EventManager {
    relational: Arc<RelationalEventSource>,
    remote: Arc<dyn EventSource>,
    composite: CompositeEventSource,
    default_limit: usize,
}

impl EventManager {
    pub fn new(
        relational: Arc<RelationalEventSource>,
        remote: Arc<dyn EventSource>,
        default_limit: usize,
    ) -> Self {
        let relational_source: Arc<dyn EventSource> = relational.clone();
        let composite = CompositeEventSource::new(vec![relational_source, remote.clone()]);
        Self {
            relational,
            remote,
            composite,
            default_limit,
        }
    }

    /// Wires the SQLite store and the remote catalog client from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, SourceError> {
        let pool = ConnectionPool::open(&config.database_path(), config.pool_size)?;
        let relational = RelationalEventSource::new(Arc::new(SqliteDataSource::new(pool)));
        let remote = RemoteCatalogSource::from_config(config)?;
        Ok(Self::new(
            Arc::new(relational),
            Arc::new(remote),
            config.default_limit,
        ))
    }

    pub fn source(&self, kind: SourceKind) -> &dyn EventSource {
        match kind {
            SourceKind::Relational => self.relational.as_ref(),
            SourceKind::Remote => self.remote.as_ref(),
            SourceKind::Composite => &self.composite,
        }
    }

    /// Runs one lookup per populated field, in the order eventId,
    /// classification, segment, organizerId, keyword, and concatenates the
    /// results. Fields are not intersected: a request with both an id and
    /// a keyword returns the id match followed by the keyword matches.
    ///
    /// `organizerId` always goes to the relational source. A request with no
    /// fields set returns nothing.
    #[tracing::instrument(skip_all, fields(source = ?request.source))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Event>, SourceError> {
        let source = self.source(request.source);
        let limit = Some(request.limit.unwrap_or(self.default_limit));
        let mut events = Vec::new();

        if let Some(id) = present(&request.event_id) {
            events.extend(source.find_by_event_id(id).await?);
        }
        for filter in [&request.classification, &request.segment] {
            let Some(value) = present(filter) else {
                continue;
            };
            let names = utils::split_names(value);
            if !names.is_empty() {
                events.extend(source.find_by_genre(&names, limit).await?);
            }
        }
        if let Some(organizer_id) = request.organizer_id {
            events.extend(self.relational.find_by_organizer(organizer_id, limit).await?);
        }
        if let Some(keyword) = present(&request.keyword) {
            events.extend(source.find_by_keyword(keyword, limit).await?);
        }

        tracing::debug!(results = events.len(), "search finished");
        Ok(events)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
