//! Chart series grouping.
//!
//! Partitions events into one line series per (category, location) pair,
//! colored from a fixed per-category palette.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::errors::SeismomapError;
use crate::models::{Category, SeismicEvent};

/// Alpha used for the translucent fill variant of a series color.
pub const FILL_ALPHA: f32 = 0.2;

/// An RGBA color, written as `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    /// Same color at the fill alpha.
    #[must_use]
    pub fn translucent(self) -> Self {
        Self {
            a: FILL_ALPHA,
            ..self
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl std::str::FromStr for Rgba {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("expected rgba(r, g, b, a), got '{s}'"))?;

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("rgba requires 4 values, got {}", parts.len()));
        }

        let channel = |p: &str| {
            p.parse::<u8>()
                .map_err(|e| format!("invalid color channel '{p}': {e}"))
        };
        let a = parts[3]
            .parse::<f32>()
            .map_err(|e| format!("invalid alpha '{}': {e}", parts[3]))?;
        if !(0.0..=1.0).contains(&a) {
            return Err(format!("alpha {a} out of range [0, 1]"));
        }

        Ok(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
            a,
        })
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Category -> line color lookup.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    colors: HashMap<Category, Rgba>,
}

impl Palette {
    /// A palette with no registered categories.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the color for a category.
    pub fn insert(&mut self, category: Category, color: Rgba) {
        self.colors.insert(category, color);
    }

    /// Look up the line color for a category.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategoryColor` if the category is not registered.
    pub fn color(&self, category: &Category) -> Result<Rgba, SeismomapError> {
        self.colors
            .get(category)
            .copied()
            .ok_or_else(|| SeismomapError::UnknownCategoryColor(category.clone()))
    }
}

/// One (time, magnitude) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub magnitude: f64,
}

/// A named line series for one category at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// `"{category}-{location}"`
    pub label: String,
    pub category: Category,
    pub location: String,
    pub points: Vec<ChartPoint>,
    pub border_color: Rgba,
    pub background_color: Rgba,
}

/// Axis scale kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Time,
    Linear,
}

/// Axis labeling for the chart surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub kind: AxisKind,
    pub title: String,
}

/// Layout hints handed to the chart surface with the series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartLayout {
    pub x: Axis,
    pub y: Axis,
    pub maintain_aspect_ratio: bool,
    pub fill: bool,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            x: Axis {
                kind: AxisKind::Time,
                title: "Timestamp".to_string(),
            },
            y: Axis {
                kind: AxisKind::Linear,
                title: "Magnitude".to_string(),
            },
            maintain_aspect_ratio: false,
            fill: false,
        }
    }
}

/// Everything the chart surface needs to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub series: Vec<ChartSeries>,
    pub layout: ChartLayout,
}

/// Builds chart series from filtered events.
#[derive(Debug, Clone)]
pub struct EventGrouper {
    palette: Palette,
    layout: ChartLayout,
}

impl EventGrouper {
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            layout: ChartLayout::default(),
        }
    }

    /// Group events into series keyed by `"{category}-{location}"`.
    ///
    /// Keys appear in first-seen order and points keep input order; events
    /// are not re-sorted.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategoryColor` if any event's category has no palette
    /// entry.
    pub fn group<T>(&self, events: &[T]) -> Result<Vec<ChartSeries>, SeismomapError>
    where
        T: AsRef<SeismicEvent>,
    {
        let mut series: Vec<ChartSeries> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for event in events {
            let event = event.as_ref();
            let label = format!("{}-{}", event.category, event.location);
            let point = ChartPoint {
                timestamp: event.timestamp,
                magnitude: event.magnitude,
            };

            if let Some(&pos) = index.get(&label) {
                series[pos].points.push(point);
                continue;
            }

            let color = self.palette.color(&event.category)?;
            index.insert(label.clone(), series.len());
            series.push(ChartSeries {
                label,
                category: event.category.clone(),
                location: event.location.clone(),
                points: vec![point],
                border_color: color,
                background_color: color.translucent(),
            });
        }

        Ok(series)
    }

    /// Group events and attach the chart layout.
    ///
    /// # Errors
    ///
    /// Same as [`EventGrouper::group`].
    pub fn chart<T>(&self, events: &[T]) -> Result<Chart, SeismomapError>
    where
        T: AsRef<SeismicEvent>,
    {
        Ok(Chart {
            series: self.group(events)?,
            layout: self.layout.clone(),
        })
    }
}
