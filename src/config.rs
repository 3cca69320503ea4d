//! Session configuration.
//!
//! Every value has a default; a JSON document and environment variables can
//! override them. The palette and geocoder credentials are handed to the
//! components that need them at construction.

use std::collections::BTreeMap;
use std::env;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::chart::{Palette, Rgba};
use crate::errors::SeismomapError;
use crate::filters::MagnitudeRange;
use crate::models::{Category, Coordinate};

/// Environment variable holding the geocoding API key.
pub const ENV_API_KEY: &str = "SEISMOMAP_GEOCODE_API_KEY";

/// Environment variable overriding the geocoding base URL.
pub const ENV_BASE_URL: &str = "SEISMOMAP_GEOCODE_URL";

/// Environment variable overriding the per-lookup timeout.
pub const ENV_TIMEOUT_SECS: &str = "SEISMOMAP_GEOCODE_TIMEOUT_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    /// Category code -> `rgba(r, g, b, a)` line color
    pub palette: BTreeMap<String, String>,
    pub map: MapConfig,
    pub filter: FilterConfig,
    pub location_images: Vec<LocationImage>,
}

/// Geocoding service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Bounded wait per lookup; a timeout counts as "no result"
    pub timeout_secs: u64,
    /// Maximum lookups in flight at once
    pub max_concurrent: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_concurrent: 8,
        }
    }
}

/// Initial map viewport.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center: Coordinate,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: Coordinate {
                lat: 53.5444,
                lng: -113.4909,
            },
            zoom: 7,
        }
    }
}

/// Widest bounds used when the user has not narrowed the filters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub date_floor: DateTime<Utc>,
    pub magnitude_min: f64,
    pub magnitude_max: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date_floor: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            magnitude_min: 0.0,
            magnitude_max: 10.0,
        }
    }
}

/// Place name to image mapping for list cards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationImage {
    pub place: String,
    pub image: String,
}

fn default_palette() -> BTreeMap<String, String> {
    [
        ("ABG", "rgba(255, 99, 132, 1)"),
        ("BEG", "rgba(75, 192, 192, 1)"),
        ("AIR", "rgba(255, 206, 86, 1)"),
        ("SUB", "rgba(153, 102, 255, 1)"),
    ]
    .into_iter()
    .map(|(code, color)| (code.to_string(), color.to_string()))
    .collect()
}

fn default_location_images() -> Vec<LocationImage> {
    [
        ("Calgary, Alberta", "images/calgary.jpg"),
        ("Banff National Park, Alberta", "images/banff.jpg"),
        ("Kananaskis Country, Alberta", "images/banff.jpg"),
        ("Lake Louise, Alberta", "images/banff.jpg"),
        ("Jasper National Park, Alberta", "images/banff.jpg"),
        ("Canmore, Alberta", "images/banff.jpg"),
    ]
    .into_iter()
    .map(|(place, image)| LocationImage {
        place: place.to_string(),
        image: image.to_string(),
    })
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder: GeocoderConfig::default(),
            palette: default_palette(),
            map: MapConfig::default(),
            filter: FilterConfig::default(),
            location_images: default_location_images(),
        }
    }
}

impl Config {
    /// Configuration with every default filled in.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document on top of the defaults.
    ///
    /// Sections omitted from the document keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, SeismomapError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment override is invalid.
    pub fn from_env() -> Result<Self, SeismomapError> {
        let mut config = Self::with_defaults();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `SEISMOMAP_GEOCODE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout override is not a positive integer.
    pub fn apply_env(&mut self) -> Result<(), SeismomapError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SeismomapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.geocoder.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            self.geocoder.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.geocoder.timeout_secs = raw.trim().parse().map_err(|e| {
                SeismomapError::Config(format!("{ENV_TIMEOUT_SECS}={raw:?}: {e}"))
            })?;
        }
        self.validate()
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid value.
    pub fn validate(&self) -> Result<(), SeismomapError> {
        if self.geocoder.timeout_secs == 0 {
            return Err(SeismomapError::Config(
                "geocoder timeout must be positive".into(),
            ));
        }
        if self.geocoder.max_concurrent == 0 {
            return Err(SeismomapError::Config(
                "geocoder concurrency must be positive".into(),
            ));
        }
        MagnitudeRange::new(self.filter.magnitude_min, self.filter.magnitude_max)
            .map_err(|e| SeismomapError::Config(e.to_string()))?;
        self.palette()?;
        Ok(())
    }

    /// Build the chart palette from the configured colors.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a color string cannot be parsed.
    pub fn palette(&self) -> Result<Palette, SeismomapError> {
        let mut palette = Palette::empty();
        for (code, color) in &self.palette {
            let rgba: Rgba = color
                .parse()
                .map_err(|e| SeismomapError::Config(format!("palette entry {code}: {e}")))?;
            palette.insert(Category::from(code.as_str()), rgba);
        }
        Ok(palette)
    }
}
