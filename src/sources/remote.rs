use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

use super::catalog::{self, CatalogResponse};
use super::{EventSource, SourceError};
use crate::config::AppConfig;
use crate::models::{Event, EventOrigin};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "EventMonkey/0.1";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog http error: {0}")]
    Http(String),
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("catalog parse error: {0}")]
    Parse(String),
    #[error("invalid catalog endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Events from the remote, page-limited event catalog.
pub struct RemoteCatalogSource {
    client: Client,
    endpoint: Url,
    api_key: String,
    page_size: usize,
}

impl RemoteCatalogSource {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        page_size: usize,
    ) -> Result<Self, CatalogError> {
        let endpoint =
            Url::parse(endpoint).map_err(|err| CatalogError::InvalidEndpoint(err.to_string()))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| CatalogError::Http(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            page_size: page_size.max(1),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let api_key = config.ticketmaster_api_key.clone().unwrap_or_else(|| {
            tracing::warn!("no catalog api key configured; remote lookups will be rejected");
            String::new()
        });
        Self::new(&config.ticketmaster_endpoint, api_key, config.default_limit)
    }

    fn request_url(&self, filters: &[(&str, String)], size: usize) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apikey", &self.api_key);
            for (key, value) in filters {
                query.append_pair(key, value);
            }
            query.append_pair("size", &size.to_string());
        }
        url
    }

    async fn fetch(
        &self,
        filters: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, CatalogError> {
        let size = limit.unwrap_or(self.page_size);
        if size == 0 {
            return Ok(Vec::new());
        }
        tracing::debug!(?filters, size, "querying event catalog");

        let response = self
            .client
            .get(self.request_url(filters, size))
            .send()
            .await
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CatalogError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CatalogResponse =
            serde_json::from_str(&body).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Ok(catalog::map_limited(
            payload.into_raw_events(),
            Some(size),
            catalog::to_event,
        ))
    }
}

#[async_trait]
impl EventSource for RemoteCatalogSource {
    fn name(&self) -> &'static str {
        EventOrigin::Remote.as_str()
    }

    async fn find_by_event_id(&self, id: &str) -> Result<Option<Event>, SourceError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let events = self.fetch(&[("id", id.to_string())], Some(1)).await?;
        Ok(events.into_iter().next())
    }

    async fn find_by_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let filters = [("classificationName", names.join(","))];
        Ok(self.fetch(&filters, limit).await?)
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
        let filters = [("keyword", text.to_string())];
        Ok(self.fetch(&filters, limit).await?)
    }

    async fn find_excluding_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        if names.is_empty() {
            return Ok(self.fetch(&[], limit).await?);
        }
        let negated: Vec<String> = names.iter().map(|name| format!("-{name}")).collect();
        let filters = [("classificationName", negated.join(","))];
        Ok(self.fetch(&filters, limit).await?)
    }
}
