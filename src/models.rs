//! Data models for seismic events.
//!
//! Raw events carry a free-text location; enrichment attaches a coordinate.
//! Both shapes serialize with the `type` key used by the event dataset.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SeismomapError;

/// Lowest magnitude accepted on input.
pub const MIN_PLAUSIBLE_MAGNITUDE: f64 = -3.0;

/// Highest magnitude accepted on input.
pub const MAX_PLAUSIBLE_MAGNITUDE: f64 = 10.0;

/// Seismic event type code.
///
/// Unregistered codes are kept as `Other` so they reach the chart palette
/// lookup instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Abg,
    Beg,
    Air,
    Sub,
    Other(String),
}

impl Category {
    /// Get the dataset code for this category.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Abg => "ABG",
            Self::Beg => "BEG",
            Self::Air => "AIR",
            Self::Sub => "SUB",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for Category {
    fn from(code: &str) -> Self {
        match code {
            "ABG" => Self::Abg,
            "BEG" => Self::Beg,
            "AIR" => Self::Air,
            "SUB" => Self::Sub,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.code().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single seismic reading as supplied by the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    /// Unique event ID (stable for the session)
    pub id: String,

    /// Human-readable place name
    pub location: String,

    /// Event type code
    #[serde(rename = "type", alias = "category")]
    pub category: Category,

    /// Magnitude value
    pub magnitude: f64,

    /// Event time
    pub timestamp: DateTime<Utc>,
}

impl SeismicEvent {
    /// Validate the event structure.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty id, a blank location or a magnitude
    /// outside the plausible seismic range.
    pub fn validate(&self) -> Result<(), SeismomapError> {
        if self.id.is_empty() {
            return Err(SeismomapError::Validation("empty event ID".into()));
        }
        if self.location.trim().is_empty() {
            return Err(SeismomapError::Validation(format!(
                "event {} has no location",
                self.id
            )));
        }
        if !(MIN_PLAUSIBLE_MAGNITUDE..=MAX_PLAUSIBLE_MAGNITUDE).contains(&self.magnitude) {
            return Err(SeismomapError::Validation(format!(
                "event {} magnitude {} out of range [{MIN_PLAUSIBLE_MAGNITUDE}, {MAX_PLAUSIBLE_MAGNITUDE}]",
                self.id, self.magnitude
            )));
        }
        Ok(())
    }
}

impl AsRef<SeismicEvent> for SeismicEvent {
    fn as_ref(&self) -> &SeismicEvent {
        self
    }
}

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// A seismic event with its geocoded position, if one was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: SeismicEvent,

    /// Absent when geocoding failed or found nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
}

impl EnrichedEvent {
    /// Wrap an event that has not been (or could not be) geocoded.
    #[must_use]
    pub fn unresolved(event: SeismicEvent) -> Self {
        Self {
            event,
            coordinate: None,
        }
    }

    /// Wrap an event with a resolved coordinate.
    #[must_use]
    pub fn resolved(event: SeismicEvent, coordinate: Coordinate) -> Self {
        Self {
            event,
            coordinate: Some(coordinate),
        }
    }

    /// Build the map marker for this event, if it has a position.
    #[must_use]
    pub fn marker(&self) -> Option<MapMarker> {
        self.coordinate.map(|c| MapMarker {
            id: self.event.id.clone(),
            lat: c.lat,
            lng: c.lng,
            location: self.event.location.clone(),
        })
    }
}

impl AsRef<SeismicEvent> for EnrichedEvent {
    fn as_ref(&self) -> &SeismicEvent {
        &self.event
    }
}

/// Entry handed to the map surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub location: String,
}

/// Parse a JSON array of events, validating each one.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, an event fails validation, or
/// two events share an ID.
pub fn parse_events(json: &str) -> Result<Vec<SeismicEvent>, SeismomapError> {
    let events: Vec<SeismicEvent> = serde_json::from_str(json)?;

    let mut seen = HashSet::with_capacity(events.len());
    for event in &events {
        event.validate()?;
        if !seen.insert(event.id.as_str()) {
            return Err(SeismomapError::Validation(format!(
                "duplicate event ID {}",
                event.id
            )));
        }
    }

    Ok(events)
}
