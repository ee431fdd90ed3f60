//! The location search state machine behind the task form.
//!
//! Keystrokes arm a debounce timer; when it fires a lookup runs on the tokio
//! runtime and reports back over a channel. The owner applies arrivals with
//! [`LocationSearchController::check_lookup_results`] or
//! [`LocationSearchController::next_lookup`]. Every intent that supersedes the
//! current suggestions bumps a generation counter, and arrivals tagged with an
//! older generation are dropped, so replies that come back out of order never
//! overwrite newer state.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{
  CURRENT_LOCATION, GeocodeError, Geocoder, SelectedLocation, SuggestionCandidate,
  UNKNOWN_LOCATION, first_label,
};
use crate::location::{LocationError, LocationProvider, PermissionStatus};
use crate::map::camera::{FOCUS_ANIMATION, MapCamera};
use crate::map::coordinates::{CameraRegion, WGS84Coordinate};
use crate::notice::Notice;

#[derive(Error, Debug)]
pub enum SearchError {
  #[error("Empty search query")]
  EmptyQuery,
  #[error("Location not found")]
  NotFound,
  #[error("Location search failed: {0}")]
  Geocode(#[from] GeocodeError),
  #[error("Location permission denied")]
  PermissionDenied,
  #[error("Could not read device location: {0}")]
  Location(#[from] LocationError),
}

impl SearchError {
  /// What the user gets to see for this failure.
  #[must_use]
  pub fn notice(&self) -> Notice {
    match self {
      SearchError::EmptyQuery => Notice::new("Empty Search", "Please enter a location to search"),
      SearchError::NotFound => Notice::new(
        "Not Found",
        "Location not found. Please try a different search.",
      ),
      SearchError::Geocode(_) => Notice::new("Error", "Failed to search location"),
      SearchError::PermissionDenied => Notice::new(
        "Permission Denied",
        "Location permission is required to use this feature",
      ),
      SearchError::Location(_) => Notice::new("Error", "Failed to get your location"),
    }
  }
}

/// Tuning of the suggestion lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
  /// Quiet period after the last keystroke before a lookup starts.
  pub debounce_ms: u64,
  /// Shorter (trimmed) queries never reach the network.
  pub min_query_chars: usize,
  /// Upper bound of suggestions, and of concurrent reverse lookups per batch.
  /// Also the number of hits requested from Nominatim.
  pub max_suggestions: usize,
}

impl SearchSettings {
  #[must_use]
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

impl Default for SearchSettings {
  fn default() -> Self {
    Self {
      debounce_ms: 500,
      min_query_chars: 3,
      max_suggestions: 5,
    }
  }
}

/// Collaborators of the controller, handed in by whoever builds the screen.
#[derive(Clone)]
pub struct SearchContext {
  pub geocoder: Arc<dyn Geocoder>,
  pub camera: Arc<dyn MapCamera>,
  pub location: Arc<dyn LocationProvider>,
  pub settings: SearchSettings,
}

impl SearchContext {
  #[must_use]
  pub fn new(
    geocoder: Arc<dyn Geocoder>,
    camera: Arc<dyn MapCamera>,
    location: Arc<dyn LocationProvider>,
  ) -> Self {
    Self {
      geocoder,
      camera,
      location,
      settings: SearchSettings::default(),
    }
  }

  #[must_use]
  pub fn with_settings(mut self, settings: SearchSettings) -> Self {
    self.settings = settings;
    self
  }
}

/// Visibility of the suggestion dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionPanel {
  #[default]
  Hidden,
  Loading,
  Shown,
}

/// What happened to a lookup result when it reached the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
  /// Suggestions were replaced and are shown.
  Published,
  /// The lookup found nothing, suggestions were cleared.
  Cleared,
  /// A newer intent superseded the lookup, its result was dropped.
  Stale,
}

#[derive(Debug)]
struct LookupOutcome {
  generation: u64,
  query: String,
  suggestions: Vec<SuggestionCandidate>,
}

pub struct LocationSearchController {
  context: SearchContext,
  query: String,
  suggestions: Vec<SuggestionCandidate>,
  panel: SuggestionPanel,
  selected: Option<SelectedLocation>,
  generation: u64,
  debounce: Option<JoinHandle<()>>,
  lookup_sender: UnboundedSender<LookupOutcome>,
  lookup_receiver: UnboundedReceiver<LookupOutcome>,
}

impl LocationSearchController {
  #[must_use]
  pub fn new(context: SearchContext) -> Self {
    let (lookup_sender, lookup_receiver) = unbounded_channel();
    Self {
      context,
      query: String::new(),
      suggestions: Vec::new(),
      panel: SuggestionPanel::Hidden,
      selected: None,
      generation: 0,
      debounce: None,
      lookup_sender,
      lookup_receiver,
    }
  }

  #[must_use]
  pub fn query(&self) -> &str {
    &self.query
  }

  #[must_use]
  pub fn suggestions(&self) -> &[SuggestionCandidate] {
    &self.suggestions
  }

  #[must_use]
  pub fn panel(&self) -> SuggestionPanel {
    self.panel
  }

  #[must_use]
  pub fn is_showing_suggestions(&self) -> bool {
    self.panel == SuggestionPanel::Shown && !self.suggestions.is_empty()
  }

  #[must_use]
  pub fn selected_location(&self) -> Option<&SelectedLocation> {
    self.selected.as_ref()
  }

  /// Text field edit. Must be called from within a tokio runtime.
  pub fn on_query_changed(&mut self, text: impl Into<String>) {
    self.query = text.into();
    self.supersede();

    let settings = self.context.settings;
    if self.query.trim().chars().count() < settings.min_query_chars {
      self.suggestions.clear();
      self.panel = SuggestionPanel::Hidden;
      return;
    }

    if self.panel == SuggestionPanel::Hidden {
      self.panel = SuggestionPanel::Loading;
    }

    let generation = self.generation;
    let query = self.query.clone();
    let geocoder = Arc::clone(&self.context.geocoder);
    let sender = self.lookup_sender.clone();
    let deadline = Instant::now() + settings.debounce();

    // Only the sleep is abortable. Once fired, the lookup runs detached and is
    // filtered by generation on arrival.
    self.debounce = Some(tokio::spawn(async move {
      tokio::time::sleep_until(deadline).await;
      tokio::spawn(async move {
        debug!("Looking up suggestions for '{query}' (generation {generation})");
        let suggestions =
          lookup_suggestions(geocoder.as_ref(), &query, settings.max_suggestions).await;
        let _ = sender.send(LookupOutcome {
          generation,
          query,
          suggestions,
        });
      });
    }));
  }

  /// Apply every lookup result that already arrived, without waiting.
  pub fn check_lookup_results(&mut self) -> Vec<LookupStatus> {
    let mut applied = Vec::new();
    while let Ok(outcome) = self.lookup_receiver.try_recv() {
      applied.push(self.apply_lookup(outcome));
    }
    applied
  }

  /// Wait for the next lookup result and apply it.
  ///
  /// Only returns once a fired lookup reports back, so call it after a query
  /// long enough to arm the timer.
  pub async fn next_lookup(&mut self) -> Option<LookupStatus> {
    let outcome = self.lookup_receiver.recv().await?;
    Some(self.apply_lookup(outcome))
  }

  /// Explicit search: jump to the best match of the typed text.
  ///
  /// The typed text stays the address of the selection, the match is not
  /// reverse geocoded.
  pub async fn on_submit(&mut self) -> Result<SelectedLocation, SearchError> {
    if self.query.trim().is_empty() {
      return Err(SearchError::EmptyQuery);
    }

    self.supersede();
    self.panel = SuggestionPanel::Hidden;

    let hits = self.context.geocoder.forward(&self.query).await?;
    let Some(&coordinate) = hits.first() else {
      return Err(SearchError::NotFound);
    };

    self.focus(coordinate);
    let selected = SelectedLocation::new(coordinate, self.query.clone());
    info!("Searched location: '{}' at {coordinate}", selected.address);
    self.selected = Some(selected.clone());
    Ok(selected)
  }

  pub fn on_suggestion_picked(&mut self, candidate: SuggestionCandidate) {
    self.supersede();
    self.panel = SuggestionPanel::Hidden;
    self.query.clone_from(&candidate.address);
    self.focus(candidate.coordinate());
    info!("Selected suggestion: {candidate}");
    self.selected = Some(candidate.into());
  }

  /// A tap on the map selects that point, named if the geocoder can.
  pub async fn on_map_tapped(&mut self, coordinate: WGS84Coordinate) -> SelectedLocation {
    let address = self
      .reverse_label(coordinate)
      .await
      .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
    let selected = SelectedLocation::new(coordinate, address);
    info!("Map tapped: '{}' at {coordinate}", selected.address);
    self.selected = Some(selected.clone());
    selected
  }

  pub async fn on_recenter_requested(&mut self) -> Result<SelectedLocation, SearchError> {
    let location = Arc::clone(&self.context.location);
    if location.request_permission().await == PermissionStatus::Denied {
      return Err(SearchError::PermissionDenied);
    }

    let position = location.current_position().await?;
    self.focus(position);

    let address = self
      .reverse_label(position)
      .await
      .unwrap_or_else(|| CURRENT_LOCATION.to_string());
    let selected = SelectedLocation::new(position, address);
    info!("Recentered on '{}' at {position}", selected.address);
    self.selected = Some(selected.clone());
    Ok(selected)
  }

  fn apply_lookup(&mut self, outcome: LookupOutcome) -> LookupStatus {
    if outcome.generation != self.generation {
      debug!(
        "Discarding stale suggestions for '{}' (generation {} < {})",
        outcome.query, outcome.generation, self.generation
      );
      return LookupStatus::Stale;
    }

    if outcome.suggestions.is_empty() {
      debug!("No suggestions for '{}'", outcome.query);
      self.suggestions.clear();
      self.panel = SuggestionPanel::Hidden;
      LookupStatus::Cleared
    } else {
      debug!(
        "Publishing {} suggestions for '{}'",
        outcome.suggestions.len(),
        outcome.query
      );
      self.suggestions = outcome.suggestions;
      self.panel = SuggestionPanel::Shown;
      LookupStatus::Published
    }
  }

  /// Cancel the armed timer and invalidate every lookup already dispatched.
  fn supersede(&mut self) {
    if let Some(timer) = self.debounce.take() {
      timer.abort();
    }
    self.generation += 1;
  }

  fn focus(&self, coordinate: WGS84Coordinate) {
    self
      .context
      .camera
      .animate_to(CameraRegion::focused_on(coordinate), FOCUS_ANIMATION);
  }

  async fn reverse_label(&self, coordinate: WGS84Coordinate) -> Option<String> {
    match self.context.geocoder.reverse(coordinate).await {
      Ok(candidates) => first_label(&candidates),
      Err(e) => {
        debug!("Reverse geocoding {coordinate} failed: {e}");
        None
      }
    }
  }
}

impl Drop for LocationSearchController {
  fn drop(&mut self) {
    if let Some(timer) = self.debounce.take() {
      timer.abort();
    }
  }
}

/// Forward geocode `query`, then name the first `limit` hits concurrently.
///
/// Failures never surface: a failed forward lookup yields no suggestions and a
/// failed reverse lookup falls back to the fixed coordinate label.
async fn lookup_suggestions(
  geocoder: &dyn Geocoder,
  query: &str,
  limit: usize,
) -> Vec<SuggestionCandidate> {
  let hits = match geocoder.forward(query).await {
    Ok(hits) => hits,
    Err(e) => {
      debug!("Forward geocoding '{query}' failed: {e}");
      return Vec::new();
    }
  };

  // join_all keeps input order regardless of completion order.
  join_all(
    hits
      .into_iter()
      .take(limit)
      .map(|coordinate| name_candidate(geocoder, coordinate)),
  )
  .await
}

async fn name_candidate(geocoder: &dyn Geocoder, coordinate: WGS84Coordinate) -> SuggestionCandidate {
  let address = match geocoder.reverse(coordinate).await {
    Ok(candidates) => first_label(&candidates),
    Err(e) => {
      debug!("Reverse geocoding {coordinate} failed: {e}");
      None
    }
  }
  .unwrap_or_else(|| coordinate.fixed_label());

  SuggestionCandidate {
    address,
    latitude: coordinate.lat,
    longitude: coordinate.lon,
  }
}
