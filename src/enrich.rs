//! Geocode enrichment of raw events.
//!
//! Every event in a batch gets exactly one lookup. Lookups run concurrently up
//! to a cap, each under its own timeout, and the batch settles only when all
//! of them have. A failed lookup never fails the batch: the event is kept
//! without a coordinate and the failure is reported alongside.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::client::Geocoder;
use crate::config::GeocoderConfig;
use crate::models::{EnrichedEvent, SeismicEvent};

/// Why a single lookup produced no coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Service answered with no match
    NoMatch,
    /// Transport or service error
    Lookup(String),
    /// No answer within the per-lookup timeout
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => f.write_str("no match"),
            Self::Lookup(e) => write!(f, "lookup failed: {e}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// A per-event enrichment failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub event_id: String,
    pub location: String,
    pub reason: FailureReason,
}

/// Result of one enrichment batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    /// Same length and order as the input
    pub events: Vec<EnrichedEvent>,
    pub failures: Vec<LookupFailure>,
}

impl EnrichmentReport {
    /// Number of events that received a coordinate.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.events.iter().filter(|e| e.coordinate.is_some()).count()
    }
}

/// Attaches coordinates to events through a [`Geocoder`].
#[derive(Clone)]
pub struct GeocodeEnricher {
    geocoder: Arc<dyn Geocoder>,
    timeout: Duration,
    max_concurrent: usize,
}

impl GeocodeEnricher {
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>, config: &GeocoderConfig) -> Self {
        Self {
            geocoder,
            timeout: Duration::from_secs(config.timeout_secs),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Override the per-lookup timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Geocode every event in `events`.
    pub async fn enrich(&self, events: &[SeismicEvent]) -> EnrichmentReport {
        let outcomes: Vec<(EnrichedEvent, Option<LookupFailure>)> =
            stream::iter(events.iter().cloned())
                .map(|event| self.enrich_one(event))
                .buffered(self.max_concurrent)
                .collect()
                .await;

        let mut report = EnrichmentReport {
            events: Vec::with_capacity(outcomes.len()),
            failures: Vec::new(),
        };
        for (event, failure) in outcomes {
            report.events.push(event);
            report.failures.extend(failure);
        }

        debug!(
            "enriched {} events ({} resolved, {} failed)",
            report.events.len(),
            report.resolved(),
            report.failures.len()
        );
        report
    }

    async fn enrich_one(&self, event: SeismicEvent) -> (EnrichedEvent, Option<LookupFailure>) {
        let lookup = self.geocoder.geocode(&event.location);
        let outcome = tokio::time::timeout(self.timeout, lookup).await;
        let reason = match outcome {
            Ok(Ok(Some(coordinate))) => {
                return (EnrichedEvent::resolved(event, coordinate), None);
            }
            Ok(Ok(None)) => FailureReason::NoMatch,
            Ok(Err(e)) => FailureReason::Lookup(e.to_string()),
            Err(_) => FailureReason::TimedOut,
        };

        warn!(
            event_id = %event.id,
            location = %event.location,
            "no coordinates: {}",
            reason
        );

        let failure = LookupFailure {
            event_id: event.id.clone(),
            location: event.location.clone(),
            reason,
        };
        (EnrichedEvent::unresolved(event), Some(failure))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::errors::SeismomapError;
    use crate::models::{Category, Coordinate};

    /// Answers from a fixed table; some addresses error or hang.
    struct TableGeocoder {
        table: HashMap<&'static str, Coordinate>,
    }

    #[async_trait]
    impl Geocoder for TableGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, SeismomapError> {
            match address {
                "Broken Place" => Err(SeismomapError::InvalidResponse("boom".into())),
                "Slow Place" => std::future::pending().await,
                _ => Ok(self.table.get(address).copied()),
            }
        }
    }

    fn geocoder() -> Arc<dyn Geocoder> {
        Arc::new(TableGeocoder {
            table: HashMap::from([
                ("Calgary, Alberta", Coordinate { lat: 51.04, lng: -114.07 }),
                ("Canmore, Alberta", Coordinate { lat: 51.09, lng: -115.35 }),
            ]),
        })
    }

    fn event(id: &str, location: &str) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            location: location.into(),
            category: Category::Abg,
            magnitude: 1.0,
            timestamp: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn enricher() -> GeocodeEnricher {
        GeocodeEnricher::new(geocoder(), &GeocoderConfig::default())
            .with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_partial_failure_isolated() {
        let events = vec![
            event("1", "Calgary, Alberta"),
            event("2", "Nowhere"),
            event("3", "Broken Place"),
            event("4", "Canmore, Alberta"),
        ];
        let report = enricher().enrich(&events).await;

        assert_eq!(report.events.len(), 4);
        let ids: Vec<&str> = report.events.iter().map(|e| e.event.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4"]);

        assert!(report.events[0].coordinate.is_some());
        assert!(report.events[1].coordinate.is_none());
        assert!(report.events[2].coordinate.is_none());
        assert!(report.events[3].coordinate.is_some());
        assert_eq!(report.resolved(), 2);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].reason, FailureReason::NoMatch);
        assert!(matches!(report.failures[1].reason, FailureReason::Lookup(_)));
    }

    #[tokio::test]
    async fn test_hung_lookup_times_out() {
        let events = vec![event("1", "Slow Place"), event("2", "Calgary, Alberta")];
        let report = enricher().enrich(&events).await;

        assert_eq!(report.events.len(), 2);
        assert!(report.events[0].coordinate.is_none());
        assert!(report.events[1].coordinate.is_some());
        assert_eq!(report.failures[0].reason, FailureReason::TimedOut);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = enricher().enrich(&[]).await;
        assert!(report.events.is_empty());
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_cap_of_one_still_completes() {
        let config = GeocoderConfig {
            max_concurrent: 1,
            ..GeocoderConfig::default()
        };
        let enricher = GeocodeEnricher::new(geocoder(), &config);
        let events = vec![event("1", "Calgary, Alberta"), event("2", "Canmore, Alberta")];
        let report = enricher.enrich(&events).await;
        assert_eq!(report.resolved(), 2);
    }

    #[tokio::test]
    async fn test_enrich_in_spawned_task() {
        let enricher = enricher();
        let events = Arc::new(vec![event("1", "Calgary, Alberta"), event("2", "Nowhere")]);
        let report = tokio::spawn(async move { enricher.enrich(&events).await })
            .await
            .unwrap();
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.resolved(), 1);
    }
}
