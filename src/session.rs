//! Session message loop.
//!
//! All state changes arrive as [`Message`]s on one channel and are handled to
//! completion, one at a time: a single view transition or criteria update,
//! then a pure recomputation of the frame, then one render. Geocoding is the
//! only work that leaves the loop; each batch runs in a task owned by the
//! session and its result comes back tagged with the batch sequence number.
//! Only the newest batch is committed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::chart::EventGrouper;
use crate::client::Geocoder;
use crate::config::Config;
use crate::enrich::{EnrichmentReport, GeocodeEnricher};
use crate::errors::SeismomapError;
use crate::filters::{DateRange, FilterCriteria, MagnitudeRange, distinct_categories};
use crate::models::{Category, SeismicEvent};
use crate::output::{EventCard, Frame, ListBody, ListFrame, MapFrame, Surface};
use crate::view::{Transition, ViewCoordinator, ViewState};

/// Inputs to the session.
#[derive(Debug, Clone)]
pub enum Message {
    /// Replace the raw event set and geocode it
    LoadEvents(Vec<SeismicEvent>),
    /// Geocode the current raw set again
    Refresh,
    /// A geocoding batch finished
    EnrichmentSettled { seq: u64, report: EnrichmentReport },
    /// Map marker at this location was clicked
    MarkerClicked(String),
    /// Map/list switch flipped
    ToggleView,
    /// "Back to map" pressed
    BackToMap,
    /// Show or hide the chart in the list view
    ToggleChart,
    SetSearchText(String),
    SetCategory(Option<Category>),
    SetMagnitudeRange(MagnitudeRange),
    SetDateRange(DateRange),
    /// Restore the widest criteria
    ResetFilters,
}

/// Cloneable sender the host UI uses to drive a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl SessionHandle {
    /// Queue a message.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub fn send(&self, message: Message) -> Result<(), SeismomapError> {
        self.tx
            .send(message)
            .map_err(|_| SeismomapError::SessionClosed)
    }

    /// Replace the raw events.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub fn load_events(&self, events: Vec<SeismicEvent>) -> Result<(), SeismomapError> {
        self.send(Message::LoadEvents(events))
    }

    /// Report a marker click.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub fn click_marker(&self, location: impl Into<String>) -> Result<(), SeismomapError> {
        self.send(Message::MarkerClicked(location.into()))
    }

    /// Flip the map/list switch.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub fn toggle_view(&self) -> Result<(), SeismomapError> {
        self.send(Message::ToggleView)
    }

    /// Return to the map.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub fn back_to_map(&self) -> Result<(), SeismomapError> {
        self.send(Message::BackToMap)
    }
}

/// Owns all mutable session state and the rendering surface.
pub struct Session<S: Surface> {
    config: Config,
    enricher: GeocodeEnricher,
    grouper: EventGrouper,
    raw: Arc<Vec<SeismicEvent>>,
    view: ViewCoordinator,
    criteria: FilterCriteria,
    chart_visible: bool,
    /// Sequence number of the newest enrichment batch
    seq: u64,
    /// Events without coordinates in the last committed batch
    unresolved: usize,
    /// Batches spawned but not yet settled
    batches: JoinSet<(u64, EnrichmentReport)>,
    rx: mpsc::UnboundedReceiver<Message>,
    surface: S,
}

impl<S: Surface> Session<S> {
    /// Create a session and the handle that drives it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: Config,
        geocoder: Arc<dyn Geocoder>,
        surface: S,
    ) -> Result<(Self, SessionHandle), SeismomapError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            enricher: GeocodeEnricher::new(geocoder, &config.geocoder),
            grouper: EventGrouper::new(config.palette()?),
            raw: Arc::new(Vec::new()),
            view: ViewCoordinator::new(),
            criteria: FilterCriteria::with_defaults(&config.filter),
            chart_visible: false,
            seq: 0,
            unresolved: 0,
            batches: JoinSet::new(),
            rx,
            surface,
            config,
        };

        Ok((session, SessionHandle { tx }))
    }

    #[must_use]
    pub fn view(&self) -> &ViewCoordinator {
        &self.view
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    #[must_use]
    pub fn chart_visible(&self) -> bool {
        self.chart_visible
    }

    /// Sequence number of the newest enrichment batch.
    #[must_use]
    pub fn enrichment_seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Process messages until every handle is dropped and no batch is in
    /// flight.
    ///
    /// # Errors
    ///
    /// Stops at the first message whose frame cannot be built, such as a
    /// category with no palette color.
    pub async fn run(mut self) -> Result<(), SeismomapError> {
        info!("session started");
        self.render()?;

        let mut commands_open = true;
        while commands_open || !self.batches.is_empty() {
            let message = tokio::select! {
                Some(joined) = self.batches.join_next(), if !self.batches.is_empty() => {
                    match joined {
                        Ok((seq, report)) => Message::EnrichmentSettled { seq, report },
                        Err(e) => {
                            error!("enrichment batch failed: {e}");
                            continue;
                        }
                    }
                }
                received = self.rx.recv(), if commands_open => match received {
                    Some(message) => message,
                    None => {
                        commands_open = false;
                        continue;
                    }
                },
            };

            if let Err(e) = self.dispatch(message) {
                error!("session stopped: {e}");
                return Err(e);
            }
        }

        info!("session closed");
        Ok(())
    }

    /// Handle one message and render the resulting frame.
    ///
    /// Must be called from within a tokio runtime: loading events spawns the
    /// geocoding task.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be built. Chart visibility is
    /// restored to its previous value in that case; other state changes stay.
    pub fn dispatch(&mut self, message: Message) -> Result<(), SeismomapError> {
        let chart_visible = self.chart_visible;
        self.handle(message);
        if let Err(e) = self.render() {
            self.chart_visible = chart_visible;
            return Err(e);
        }
        Ok(())
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::LoadEvents(events) => {
                info!("loaded {} raw events", events.len());
                self.raw = Arc::new(events);
                self.start_enrichment();
            }
            Message::Refresh => self.start_enrichment(),
            Message::EnrichmentSettled { seq, report } => self.commit_enrichment(seq, report),
            Message::MarkerClicked(location) => {
                let transition = self.view.click_marker(&location);
                log_transition(&transition);
            }
            Message::ToggleView => {
                let transition = self.view.toggle();
                self.after_transition(&transition);
            }
            Message::BackToMap => {
                let transition = self.view.back_to_map();
                self.after_transition(&transition);
            }
            Message::ToggleChart => {
                self.chart_visible = !self.chart_visible;
                debug!(visible = self.chart_visible, "chart toggled");
            }
            Message::SetSearchText(text) => {
                debug!(%text, "search text changed");
                self.criteria.search_text = text;
            }
            Message::SetCategory(category) => {
                debug!(?category, "category filter changed");
                self.criteria.category = category;
            }
            Message::SetMagnitudeRange(range) => {
                debug!(min = range.min(), max = range.max(), "magnitude range changed");
                self.criteria.magnitude = range;
            }
            Message::SetDateRange(range) => {
                debug!(start = %range.start(), end = %range.end(), "date range changed");
                self.criteria.dates = range;
            }
            Message::ResetFilters => {
                self.criteria = FilterCriteria::with_defaults(&self.config.filter);
                debug!("filters reset");
            }
        }
    }

    /// Reopening the map retries geocoding if the last batch left events
    /// without coordinates.
    fn after_transition(&mut self, transition: &Transition) {
        log_transition(transition);
        if matches!(transition, Transition::ReturnedToMap) && self.unresolved > 0 {
            debug!("{} events unresolved, geocoding again", self.unresolved);
            self.start_enrichment();
        }
    }

    fn start_enrichment(&mut self) {
        self.seq += 1;
        let seq = self.seq;

        let enricher = self.enricher.clone();
        let events = Arc::clone(&self.raw);
        debug!("starting enrichment batch {} ({} events)", seq, events.len());

        self.batches.spawn(async move {
            let report = enricher.enrich(&events).await;
            (seq, report)
        });
    }

    fn commit_enrichment(&mut self, seq: u64, report: EnrichmentReport) {
        if seq != self.seq {
            debug!(
                "discarding stale enrichment batch {} (current {})",
                seq, self.seq
            );
            return;
        }

        info!(
            "enrichment batch {} committed: {} events, {} without coordinates",
            seq,
            report.events.len(),
            report.failures.len()
        );
        self.unresolved = report.failures.len();
        self.view.replace_enriched(report.events);
    }

    /// Build the frame for the current state.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategoryColor` if the chart is visible and a filtered
    /// event's category has no palette color.
    pub fn frame(&self) -> Result<Frame, SeismomapError> {
        let selection = match self.view.state() {
            ViewState::Map => {
                return Ok(Frame::Map(MapFrame::new(
                    &self.config.map,
                    self.view.markers(),
                )));
            }
            ViewState::List { selection } => selection,
        };

        let filtered = self.criteria.apply(selection);
        let body = if self.chart_visible {
            ListBody::Chart(self.grouper.chart(&filtered)?)
        } else {
            ListBody::Cards(
                filtered
                    .iter()
                    .map(|e| EventCard::new(e, &self.config.location_images))
                    .collect(),
            )
        };

        Ok(Frame::List(ListFrame {
            categories: distinct_categories(selection),
            selected: selection.len(),
            shown: filtered.len(),
            body,
        }))
    }

    fn render(&mut self) -> Result<(), SeismomapError> {
        let frame = self.frame()?;
        self.surface.render(&frame);
        Ok(())
    }
}

fn log_transition(transition: &Transition) {
    match transition {
        Transition::MarkerSelected { location, count } => {
            info!("marker '{}' selected {} events", location, count);
        }
        Transition::ShowAll { count } => info!("list view showing all {} events", count),
        Transition::ReturnedToMap => info!("returned to map"),
        Transition::Ignored => debug!("view action ignored"),
    }
}
