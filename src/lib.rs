//! Seismomap - geocoded seismic events with a map/list view pivot.
//!
//! Raw events with free-text locations are geocoded in concurrent batches,
//! shown as map markers, and handed to a filterable, chartable list when the
//! user clicks a marker or switches the map off. The host application owns
//! the actual drawing through the [`output::Surface`] trait and drives a
//! [`session::Session`] with [`session::Message`]s.

pub mod chart;
pub mod client;
pub mod config;
pub mod enrich;
pub mod errors;
pub mod filters;
pub mod models;
pub mod output;
pub mod session;
pub mod telemetry;
pub mod view;

pub use chart::{Chart, ChartSeries, EventGrouper, Palette, Rgba};
pub use client::{Geocoder, GoogleGeocoder};
pub use config::Config;
pub use enrich::{EnrichmentReport, GeocodeEnricher};
pub use errors::SeismomapError;
pub use filters::{DateRange, FilterCriteria, MagnitudeRange};
pub use models::{Category, Coordinate, EnrichedEvent, SeismicEvent};
pub use output::{Frame, Surface};
pub use session::{Message, Session, SessionHandle};
pub use view::{ViewCoordinator, ViewState};
