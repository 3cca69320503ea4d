//! Event filtering logic.
//!
//! Text, category, magnitude and date predicates combined with AND. Filtering
//! is a pure function of the source slice and the criteria: it keeps input
//! order and never mutates the source.

use chrono::{DateTime, Utc};

use crate::config::FilterConfig;
use crate::errors::SeismomapError;
use crate::models::{Category, SeismicEvent};

/// Closed magnitude interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeRange {
    min: f64,
    max: f64,
}

impl MagnitudeRange {
    /// Create a range, rejecting inverted or non-finite bounds.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `min > max` or either bound is NaN/infinite.
    pub fn new(min: f64, max: f64) -> Result<Self, SeismomapError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SeismomapError::Validation(format!(
                "magnitude bounds must be finite, got [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(SeismomapError::Validation(format!(
                "min magnitude {min} must be <= max magnitude {max}"
            )));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Check if a magnitude falls within the range, bounds included.
    #[must_use]
    pub fn contains(&self, magnitude: f64) -> bool {
        magnitude >= self.min && magnitude <= self.max
    }
}

impl Default for MagnitudeRange {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl std::str::FromStr for MagnitudeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(format!(
                "magnitude range requires 2 values (min,max), got {}",
                parts.len()
            ));
        }

        let min = parts[0]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number in magnitude range: {e}"))?;
        let max = parts[1]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number in magnitude range: {e}"))?;

        Self::new(min, max).map_err(|e| e.to_string())
    }
}

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the bounds are inverted.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SeismomapError> {
        if start > end {
            return Err(SeismomapError::Validation(format!(
                "start date {start} must be <= end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Check if a timestamp falls within the range, bounds included.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// User-owned filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// Case-insensitive substring of the location; empty matches all
    pub search_text: String,
    /// Exact category; `None` matches all
    pub category: Option<Category>,
    pub magnitude: MagnitudeRange,
    pub dates: DateRange,
}

impl FilterCriteria {
    /// Widest criteria: no text, no category, configured bounds up to now.
    ///
    /// `config` is expected to have passed [`Config::validate`]; inverted or
    /// non-finite magnitude bounds fall back to [`MagnitudeRange::default`].
    ///
    /// [`Config::validate`]: crate::config::Config::validate
    #[must_use]
    pub fn with_defaults(config: &FilterConfig) -> Self {
        let now = Utc::now();
        let magnitude = MagnitudeRange::new(config.magnitude_min, config.magnitude_max)
            .unwrap_or_default();
        let dates = DateRange {
            start: config.date_floor.min(now),
            end: now,
        };
        Self {
            search_text: String::new(),
            category: None,
            magnitude,
            dates,
        }
    }

    /// Check if an event passes all filter criteria.
    #[must_use]
    pub fn matches(&self, event: &SeismicEvent) -> bool {
        self.check_text(event)
            && self.check_category(event)
            && self.check_magnitude(event)
            && self.check_dates(event)
    }

    /// Keep the events that pass, in their original order.
    #[must_use]
    pub fn apply<T>(&self, events: &[T]) -> Vec<T>
    where
        T: AsRef<SeismicEvent> + Clone,
    {
        events
            .iter()
            .filter(|e| self.matches(e.as_ref()))
            .cloned()
            .collect()
    }

    fn check_text(&self, event: &SeismicEvent) -> bool {
        if self.search_text.is_empty() {
            return true;
        }
        event
            .location
            .to_lowercase()
            .contains(&self.search_text.to_lowercase())
    }

    fn check_category(&self, event: &SeismicEvent) -> bool {
        match &self.category {
            None => true,
            Some(category) => event.category == *category,
        }
    }

    fn check_magnitude(&self, event: &SeismicEvent) -> bool {
        self.magnitude.contains(event.magnitude)
    }

    fn check_dates(&self, event: &SeismicEvent) -> bool {
        self.dates.contains(event.timestamp)
    }
}

/// Distinct categories present in `events`, in first-seen order.
#[must_use]
pub fn distinct_categories<T>(events: &[T]) -> Vec<Category>
where
    T: AsRef<SeismicEvent>,
{
    let mut categories: Vec<Category> = Vec::new();
    for event in events {
        let category = &event.as_ref().category;
        if !categories.contains(category) {
            categories.push(category.clone());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, day, 12, 0, 0).unwrap()
    }

    fn event(id: &str, location: &str, category: Category, magnitude: f64, day: u32) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            location: location.into(),
            category,
            magnitude,
            timestamp: at(day),
        }
    }

    fn sample() -> Vec<SeismicEvent> {
        vec![
            event("1", "Calgary, Alberta", Category::Abg, 1.2, 1),
            event("2", "Banff National Park, Alberta", Category::Air, 2.5, 2),
            event("3", "Canmore, Alberta", Category::Sub, 3.7, 3),
            event("4", "Banff National Park, Alberta", Category::Abg, 0.8, 4),
            event("5", "Lake Louise, Alberta", Category::Air, 4.9, 5),
        ]
    }

    fn open_criteria() -> FilterCriteria {
        FilterCriteria {
            search_text: String::new(),
            category: None,
            magnitude: MagnitudeRange::default(),
            dates: DateRange::new(at(1), at(30)).unwrap(),
        }
    }

    fn ids(events: &[SeismicEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_open_criteria_keep_everything_in_order() {
        let events = sample();
        let filtered = open_criteria().apply(&events);
        assert_eq!(ids(&filtered), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let events = sample();
        let criteria = FilterCriteria {
            search_text: "bANFF".into(),
            ..open_criteria()
        };
        assert_eq!(ids(&criteria.apply(&events)), ["2", "4"]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let events = sample();
        let criteria = FilterCriteria {
            search_text: "banff".into(),
            category: Some(Category::Abg),
            ..open_criteria()
        };
        assert_eq!(ids(&criteria.apply(&events)), ["4"]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let events = vec![
            event("low", "Calgary, Alberta", Category::Abg, 1.0, 2),
            event("under", "Calgary, Alberta", Category::Abg, 0.99, 5),
            event("first", "Calgary, Alberta", Category::Abg, 2.0, 2),
            event("early", "Calgary, Alberta", Category::Abg, 2.0, 1),
            event("edge", "Calgary, Alberta", Category::Abg, 3.0, 10),
            event("over", "Calgary, Alberta", Category::Abg, 3.01, 10),
            event("late", "Calgary, Alberta", Category::Abg, 2.0, 11),
        ];
        let criteria = FilterCriteria {
            magnitude: MagnitudeRange::new(1.0, 3.0).unwrap(),
            dates: DateRange::new(at(2), at(10)).unwrap(),
            ..open_criteria()
        };
        assert_eq!(ids(&criteria.apply(&events)), ["low", "first", "edge"]);
    }

    #[test]
    fn test_category_reset_restores_set() {
        let events = sample();
        let mut criteria = FilterCriteria {
            category: Some(Category::Air),
            ..open_criteria()
        };
        assert_eq!(ids(&criteria.apply(&events)), ["2", "5"]);

        criteria.category = None;
        assert_eq!(criteria.apply(&events).len(), events.len());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let events = sample();
        let criteria = FilterCriteria {
            magnitude: MagnitudeRange::new(1.0, 4.0).unwrap(),
            ..open_criteria()
        };
        let once = criteria.apply(&events);
        let twice = criteria.apply(&events);
        assert_eq!(once, twice);
        assert_eq!(criteria.apply(&once), once);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let events = sample();
        let criteria = FilterCriteria {
            search_text: "Tokyo".into(),
            ..open_criteria()
        };
        assert!(criteria.apply(&events).is_empty());
    }

    #[test]
    fn test_distinct_categories_first_seen_order() {
        let events = sample();
        assert_eq!(
            distinct_categories(&events),
            [Category::Abg, Category::Air, Category::Sub]
        );
    }

    #[test]
    fn test_magnitude_range_parse() {
        let range: MagnitudeRange = "1.5, 4".parse().unwrap();
        assert!((range.min() - 1.5).abs() < 0.001);
        assert!((range.max() - 4.0).abs() < 0.001);
        assert!("4,1".parse::<MagnitudeRange>().is_err());
        assert!("1".parse::<MagnitudeRange>().is_err());
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        assert!(DateRange::new(at(5), at(1)).is_err());
    }

    #[test]
    fn test_defaults_end_at_now() {
        let criteria = FilterCriteria::with_defaults(&FilterConfig::default());
        assert!(criteria.dates.end() <= Utc::now());
        assert!(criteria.dates.contains(at(1)));
        assert!(criteria.magnitude.contains(0.0));
        assert!(criteria.magnitude.contains(10.0));
    }

    #[test]
    fn test_defaults_with_inverted_config_bounds() {
        let config = FilterConfig {
            magnitude_min: 9.0,
            magnitude_max: 1.0,
            ..FilterConfig::default()
        };
        let criteria = FilterCriteria::with_defaults(&config);
        assert_eq!(criteria.magnitude, MagnitudeRange::default());
    }
}
