use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use super::{truncate_to, EventSource, SourceError};
use crate::models::Event;

/// Fans every lookup out to an ordered list of sources.
///
/// Output order always follows the source list, whatever order the
/// lookups finish in. List results are concatenated without dedup and
/// only then cut to `limit`, so earlier sources win when the limit bites.
pub struct CompositeEventSource {
    sources: Vec<Arc<dyn EventSource>>,
}

impl CompositeEventSource {
    pub fn new(sources: Vec<Arc<dyn EventSource>>) -> Self {
        Self { sources }
    }

    fn merge(batches: Vec<Vec<Event>>, limit: Option<usize>) -> Vec<Event> {
        let mut events: Vec<Event> = batches.into_iter().flatten().collect();
        truncate_to(&mut events, limit);
        events
    }
}

#[async_trait]
impl EventSource for CompositeEventSource {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn find_by_event_id(&self, id: &str) -> Result<Option<Event>, SourceError> {
        let results =
            try_join_all(self.sources.iter().map(|source| source.find_by_event_id(id))).await?;

        let mut matches = self
            .sources
            .iter()
            .zip(results)
            .filter_map(|(source, found)| found.map(|event| (source.name(), event)));
        let Some((winner, event)) = matches.next() else {
            return Ok(None);
        };
        let others: Vec<&str> = matches.map(|(name, _)| name).collect();
        if !others.is_empty() {
            tracing::warn!(
                event_id = id,
                matches = others.len() + 1,
                chosen = winner,
                also_found_in = ?others,
                "event id resolved by more than one source; using the first"
            );
        }
        Ok(Some(event))
    }

    async fn find_by_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let batches = try_join_all(
            self.sources
                .iter()
                .map(|source| source.find_by_genre(names, limit)),
        )
        .await?;
        Ok(Self::merge(batches, limit))
    }

    async fn find_by_keyword(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let batches = try_join_all(
            self.sources
                .iter()
                .map(|source| source.find_by_keyword(text, limit)),
        )
        .await?;
        Ok(Self::merge(batches, limit))
    }

    async fn find_excluding_genre(
        &self,
        names: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Event>, SourceError> {
        let batches = try_join_all(
            self.sources
                .iter()
                .map(|source| source.find_excluding_genre(names, limit)),
        )
        .await?;
        Ok(Self::merge(batches, limit))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::EventOrigin;
    use crate::sources::fixtures::{event, StaticSource};

    fn names(events: &[Event]) -> Vec<&str> {
        events.iter().map(|event| event.name.as_str()).collect()
    }

    #[tokio::test]
    async fn first_source_wins_an_id_collision() {
        let relational = StaticSource::new("relational")
            .with_event(event("42", EventOrigin::Relational, "Relational 42"))
            .with_delay(Duration::from_millis(30));
        let remote =
            StaticSource::new("remote").with_event(event("42", EventOrigin::Remote, "Remote 42"));
        let composite = CompositeEventSource::new(vec![Arc::new(relational), Arc::new(remote)]);

        let found = composite
            .find_by_event_id("42")
            .await
            .expect("lookup")
            .expect("match");
        assert_eq!(found.name, "Relational 42");
        assert_eq!(found.source, EventOrigin::Relational);
    }

    #[tokio::test]
    async fn id_lookup_skips_sources_without_a_match() {
        let relational = StaticSource::new("relational");
        let remote =
            StaticSource::new("remote").with_event(event("Z7r9", EventOrigin::Remote, "Remote"));
        let composite = CompositeEventSource::new(vec![Arc::new(relational), Arc::new(remote)]);

        let found = composite.find_by_event_id("Z7r9").await.expect("lookup");
        assert_eq!(found.map(|event| event.name), Some("Remote".to_string()));
        assert!(composite.find_by_event_id("nope").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn merges_in_source_order_then_truncates() {
        let relational = StaticSource::new("relational")
            .with_genre_results(vec![
                event("1", EventOrigin::Relational, "a"),
                event("2", EventOrigin::Relational, "b"),
            ])
            .with_delay(Duration::from_millis(30));
        let remote = StaticSource::new("remote").with_genre_results(vec![
            event("c", EventOrigin::Remote, "c"),
            event("d", EventOrigin::Remote, "d"),
        ]);
        let composite = CompositeEventSource::new(vec![Arc::new(relational), Arc::new(remote)]);

        let events = composite
            .find_by_genre(&["Rock".to_string()], Some(3))
            .await
            .expect("genre lookup");
        assert_eq!(names(&events), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn no_limit_keeps_everything_including_duplicates() {
        let shared = event("7", EventOrigin::Relational, "same");
        let first = StaticSource::new("relational").with_keyword_results(vec![shared.clone()]);
        let second = StaticSource::new("relational-replica").with_keyword_results(vec![shared]);
        let composite = CompositeEventSource::new(vec![Arc::new(first), Arc::new(second)]);

        let events = composite.find_by_keyword("same", None).await.expect("keyword");
        assert_eq!(names(&events), vec!["same", "same"]);
    }

    #[tokio::test]
    async fn excluding_lookup_queries_every_source() {
        let relational = Arc::new(
            StaticSource::new("relational")
                .with_excluding_results(vec![event("1", EventOrigin::Relational, "a")]),
        );
        let remote = Arc::new(
            StaticSource::new("remote")
                .with_excluding_results(vec![event("x", EventOrigin::Remote, "x")]),
        );
        let composite = CompositeEventSource::new(vec![relational.clone(), remote.clone()]);

        let events = composite
            .find_excluding_genre(&["Sports".to_string()], Some(10))
            .await
            .expect("excluding");
        assert_eq!(names(&events), vec!["a", "x"]);
        assert_eq!(relational.calls(), vec!["excluding:Sports".to_string()]);
        assert_eq!(remote.calls(), vec!["excluding:Sports".to_string()]);
    }

    #[tokio::test]
    async fn a_failing_source_fails_the_lookup() {
        let relational = StaticSource::new("relational")
            .with_genre_results(vec![event("1", EventOrigin::Relational, "a")]);
        let remote = StaticSource::new("remote").failing();
        let composite = CompositeEventSource::new(vec![Arc::new(relational), Arc::new(remote)]);

        let result = composite.find_by_genre(&["Rock".to_string()], None).await;
        assert!(matches!(result, Err(SourceError::Catalog(_))));
    }
}
