//! Rendered frames and a terminal surface for them.
//!
//! A [`Frame`] is everything a UI needs to draw one state of the session.
//! [`TerminalSurface`] renders frames as human-readable text (with colors),
//! JSON, or NDJSON.

use std::io::{self, Write};

use serde::Serialize;

use crate::chart::Chart;
use crate::config::{LocationImage, MapConfig};
use crate::models::{Category, Coordinate, EnrichedEvent, MapMarker};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude-based colors
const RED: &str = "\x1b[91m"; // Critical: mag >= 7.0
const YELLOW: &str = "\x1b[93m"; // Warning: mag >= 6.0
const CYAN: &str = "\x1b[96m"; // Significant: mag >= 4.5
const GREEN: &str = "\x1b[92m"; // Moderate: mag >= 3.0
const WHITE: &str = "\x1b[97m"; // Minor: mag < 3.0

const ICON_QUAKE: &str = "🌍";
const ICON_PIN: &str = "📍";
const ICON_CHART: &str = "📈";

/// Time label format for list cards, e.g. "April 01, 2023, 10:00 AM".
const CARD_TIME_FORMAT: &str = "%B %d, %Y, %-I:%M %p";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON document per frame
    Json,
    /// Newline-delimited JSON (one item per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Find the image for a location: the first table entry whose place name is
/// contained in `location`.
#[must_use]
pub fn location_image<'a>(location: &str, table: &'a [LocationImage]) -> Option<&'a str> {
    table
        .iter()
        .find(|entry| location.contains(entry.place.as_str()))
        .map(|entry| entry.image.as_str())
}

/// One event as shown in the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCard {
    pub id: String,
    pub location: String,
    pub category: Category,
    pub magnitude: f64,
    pub time: String,
    pub image: Option<String>,
}

impl EventCard {
    #[must_use]
    pub fn new(event: &EnrichedEvent, images: &[LocationImage]) -> Self {
        let e = &event.event;
        Self {
            id: e.id.clone(),
            location: e.location.clone(),
            category: e.category.clone(),
            magnitude: e.magnitude,
            time: e.timestamp.format(CARD_TIME_FORMAT).to_string(),
            image: location_image(&e.location, images).map(str::to_string),
        }
    }
}

/// Map view contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub center: Coordinate,
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
}

impl MapFrame {
    #[must_use]
    pub fn new(config: &MapConfig, markers: Vec<MapMarker>) -> Self {
        Self {
            center: config.center,
            zoom: config.zoom,
            markers,
        }
    }
}

/// What the list view shows below its filter controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ListBody {
    Cards(Vec<EventCard>),
    Chart(Chart),
}

/// List view contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListFrame {
    /// Categories present in the unfiltered selection
    pub categories: Vec<Category>,
    /// Size of the unfiltered selection
    pub selected: usize,
    /// Size after filtering
    pub shown: usize,
    pub body: ListBody,
}

/// One rendered state of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Frame {
    Map(MapFrame),
    List(ListFrame),
}

/// Something that can draw frames: a map, a list, a chart.
pub trait Surface {
    fn render(&mut self, frame: &Frame);
}

/// Get the color code for a magnitude value.
fn magnitude_color(mag: f64) -> &'static str {
    match mag {
        m if m >= 7.0 => RED,
        m if m >= 6.0 => YELLOW,
        m if m >= 4.5 => CYAN,
        m if m >= 3.0 => GREEN,
        _ => WHITE,
    }
}

/// Write a map frame in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_map_human<W: Write>(writer: &mut W, frame: &MapFrame) -> io::Result<()> {
    writeln!(
        writer,
        "{BOLD}Map{RESET} {DIM}center {:.4}, {:.4} │ zoom {} │ {} markers{RESET}",
        frame.center.lat,
        frame.center.lng,
        frame.zoom,
        frame.markers.len()
    )?;
    for marker in &frame.markers {
        writeln!(
            writer,
            "{ICON_PIN} {} {DIM}({:.4}, {:.4}){RESET}",
            marker.location, marker.lat, marker.lng
        )?;
    }
    Ok(())
}

/// Write a list frame in human-readable format with colors.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_list_human<W: Write>(writer: &mut W, frame: &ListFrame) -> io::Result<()> {
    let categories: Vec<&str> = frame.categories.iter().map(Category::code).collect();
    writeln!(
        writer,
        "{BOLD}List{RESET} {DIM}{} of {} events │ types: {}{RESET}",
        frame.shown,
        frame.selected,
        categories.join(", ")
    )?;

    match &frame.body {
        ListBody::Cards(cards) => {
            for card in cards {
                let color = magnitude_color(card.magnitude);
                let image = card.image.as_deref().unwrap_or("-");
                writeln!(
                    writer,
                    "{ICON_QUAKE} {color}{BOLD}M{:.1}{RESET} │ \
                     {:4} │ \
                     {} │ \
                     {} {DIM}[{image}]{RESET}",
                    card.magnitude, card.category.code(), card.time, card.location
                )?;
            }
        }
        ListBody::Chart(chart) => {
            writeln!(
                writer,
                "{DIM}x: {} │ y: {}{RESET}",
                chart.layout.x.title, chart.layout.y.title
            )?;
            for series in &chart.series {
                writeln!(
                    writer,
                    "{ICON_CHART} {BOLD}{}{RESET} {DIM}{} points │ {}{RESET}",
                    series.label,
                    series.points.len(),
                    series.border_color
                )?;
            }
        }
    }
    Ok(())
}

/// Write a frame as a single JSON document.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    let json = serde_json::to_string_pretty(frame)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, item: &T) -> io::Result<()> {
    let json =
        serde_json::to_string(item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write a frame as newline-delimited JSON: one marker, card or series per
/// line.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    match frame {
        Frame::Map(map) => map.markers.iter().try_for_each(|m| write_line(&mut *writer, m)),
        Frame::List(list) => match &list.body {
            ListBody::Cards(cards) => cards.iter().try_for_each(|c| write_line(&mut *writer, c)),
            ListBody::Chart(chart) => chart.series.iter().try_for_each(|s| write_line(&mut *writer, s)),
        },
    }
}

/// Write a frame in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame, format: Format) -> io::Result<()> {
    match (format, frame) {
        (Format::Human, Frame::Map(map)) => write_map_human(writer, map),
        (Format::Human, Frame::List(list)) => write_list_human(writer, list),
        (Format::Json, _) => write_json(writer, frame),
        (Format::Ndjson, _) => write_ndjson(writer, frame),
    }
}

/// Surface that prints each frame to a writer.
pub struct TerminalSurface<W: Write> {
    writer: W,
    format: Format,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(writer: W, format: Format) -> Self {
        Self { writer, format }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn render(&mut self, frame: &Frame) {
        if let Err(e) = write_frame(&mut self.writer, frame, self.format) {
            tracing::warn!("failed to write frame: {}", e);
        }
        let _ = self.writer.flush();
    }
}
