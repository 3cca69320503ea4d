//! Map/list view state machine.
//!
//! The coordinator holds the current enriched event set and decides which
//! events the list view shows. It never applies user filters; those run
//! downstream on the selection.

use std::sync::Arc;

use tracing::debug;

use crate::models::{EnrichedEvent, MapMarker};

/// Which view is showing.
///
/// The selection only exists in `List`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Map,
    List { selection: Vec<EnrichedEvent> },
}

/// What a user action did to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Marker clicked on the map; list shows that location's events
    MarkerSelected { location: String, count: usize },
    /// Map toggled off; list shows the whole enriched set
    ShowAll { count: usize },
    /// Back on the map; selection cleared
    ReturnedToMap,
    /// Action has no meaning in the current state
    Ignored,
}

/// Owns the view state and the enriched set it selects from.
#[derive(Debug, Clone, Default)]
pub struct ViewCoordinator {
    enriched: Arc<[EnrichedEvent]>,
    state: ViewState,
}

impl ViewCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.state, ViewState::Map)
    }

    /// Events shown in the list; empty on the map.
    #[must_use]
    pub fn selection(&self) -> &[EnrichedEvent] {
        match &self.state {
            ViewState::Map => &[],
            ViewState::List { selection } => selection,
        }
    }

    #[must_use]
    pub fn enriched(&self) -> &[EnrichedEvent] {
        &self.enriched
    }

    /// Replace the enriched set as a whole.
    ///
    /// A selection already showing in the list is left as it is.
    pub fn replace_enriched(&mut self, events: Vec<EnrichedEvent>) {
        self.enriched = events.into();
    }

    /// Markers for every event that has a coordinate.
    #[must_use]
    pub fn markers(&self) -> Vec<MapMarker> {
        self.enriched.iter().filter_map(EnrichedEvent::marker).collect()
    }

    /// A map marker at `location` was clicked.
    pub fn click_marker(&mut self, location: &str) -> Transition {
        if !self.is_map() {
            debug!("marker click ignored outside the map view");
            return Transition::Ignored;
        }

        let selection: Vec<EnrichedEvent> = self
            .enriched
            .iter()
            .filter(|e| e.event.location == location)
            .cloned()
            .collect();
        let count = selection.len();
        self.state = ViewState::List { selection };

        Transition::MarkerSelected {
            location: location.to_string(),
            count,
        }
    }

    /// The map/list switch was flipped.
    pub fn toggle(&mut self) -> Transition {
        match self.state {
            ViewState::Map => {
                let selection = self.enriched.to_vec();
                let count = selection.len();
                self.state = ViewState::List { selection };
                Transition::ShowAll { count }
            }
            ViewState::List { .. } => self.return_to_map(),
        }
    }

    /// The "back to map" action was taken.
    pub fn back_to_map(&mut self) -> Transition {
        match self.state {
            ViewState::Map => Transition::Ignored,
            ViewState::List { .. } => self.return_to_map(),
        }
    }

    fn return_to_map(&mut self) -> Transition {
        self.state = ViewState::Map;
        Transition::ReturnedToMap
    }
}
