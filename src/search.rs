pub mod controller;
pub mod providers;
pub mod test_utils;

use crate::map::coordinates::WGS84Coordinate;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

pub use controller::{LocationSearchController, LookupStatus, SearchContext, SearchError};

/// Label used when a map tap cannot be resolved to an address.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
/// Label used when the device position cannot be resolved to an address.
pub const CURRENT_LOCATION: &str = "Current Location";

#[derive(Error, Debug)]
pub enum GeocodeError {
  #[error("{provider} request failed: {message}")]
  Request { provider: String, message: String },
  #[error("{provider} returned an unexpected response: {message}")]
  Response { provider: String, message: String },
  #[error("No geocoding provider configured")]
  NoProvider,
}

/// Address parts of a reverse geocode hit. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
  pub name: Option<String>,
  pub street: Option<String>,
  pub city: Option<String>,
  pub region: Option<String>,
  pub country: Option<String>,
}

impl AddressComponents {
  /// Comma separated `name-or-street, city, region, country`, skipping empty parts.
  #[must_use]
  pub fn label(&self) -> String {
    let primary = non_empty(self.name.as_deref()).or_else(|| non_empty(self.street.as_deref()));
    [
      primary,
      non_empty(self.city.as_deref()),
      non_empty(self.region.as_deref()),
      non_empty(self.country.as_deref()),
    ]
    .into_iter()
    .flatten()
    .join(", ")
  }
}

fn non_empty(part: Option<&str>) -> Option<&str> {
  part.map(str::trim).filter(|p| !p.is_empty())
}

/// Label of the first usable reverse geocode hit, if any.
#[must_use]
pub fn first_label(candidates: &[AddressComponents]) -> Option<String> {
  candidates
    .first()
    .map(AddressComponents::label)
    .filter(|label| !label.is_empty())
}

/// One entry of the suggestion list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
  pub address: String,
  pub latitude: f64,
  pub longitude: f64,
}

impl SuggestionCandidate {
  #[must_use]
  pub fn coordinate(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.latitude, self.longitude)
  }
}

impl Display for SuggestionCandidate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({:.4}, {:.4})", self.address, self.latitude, self.longitude)
  }
}

/// The point a task will be attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedLocation {
  pub latitude: f64,
  pub longitude: f64,
  pub address: String,
}

impl SelectedLocation {
  #[must_use]
  pub fn new(coordinate: WGS84Coordinate, address: impl Into<String>) -> Self {
    Self {
      latitude: coordinate.lat,
      longitude: coordinate.lon,
      address: address.into(),
    }
  }

  #[must_use]
  pub fn coordinate(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.latitude, self.longitude)
  }
}

impl From<SuggestionCandidate> for SelectedLocation {
  fn from(candidate: SuggestionCandidate) -> Self {
    Self {
      latitude: candidate.latitude,
      longitude: candidate.longitude,
      address: candidate.address,
    }
  }
}

/// Forward and reverse geocoding backend.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
  /// Human-readable name of the provider
  fn name(&self) -> &str;

  /// Resolve free text into coordinates, best match first.
  async fn forward(&self, query: &str) -> Result<Vec<WGS84Coordinate>, GeocodeError>;

  /// Resolve a coordinate into address candidates, best match first.
  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Vec<AddressComponents>, GeocodeError>;
}

/// Configuration for geocoding providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeocoderConfig {
  /// Built-in coordinate parser (no API required)
  Coordinate,
  /// OpenStreetMap Nominatim (free, no API key)
  Nominatim { base_url: Option<String> },
  /// GeoJSON API addressed through URL templates
  Custom {
    name: String,
    forward_url: String,
    reverse_url: Option<String>,
    headers: Option<std::collections::HashMap<String, String>>,
  },
}

impl Default for GeocoderConfig {
  fn default() -> Self {
    Self::Nominatim { base_url: None }
  }
}

/// Chains the coordinate parser and the configured providers into one [`Geocoder`].
pub struct GeocodingService {
  providers: Vec<Arc<dyn Geocoder>>,
  coordinate_parser: Option<providers::CoordinateParser>,
}

impl GeocodingService {
  #[must_use]
  pub fn new(providers: Vec<Arc<dyn Geocoder>>) -> Self {
    Self {
      providers,
      coordinate_parser: Some(providers::CoordinateParser::new()),
    }
  }

  /// Build the service from configuration. Provider order is preserved; `limit`
  /// is how many forward hits a provider is asked for.
  #[must_use]
  pub fn with_config(
    configs: &[GeocoderConfig],
    limit: usize,
    timeout: std::time::Duration,
  ) -> Self {
    let mut providers: Vec<Arc<dyn Geocoder>> = Vec::new();
    let mut coordinate_parser = None;

    for config in configs {
      match config {
        GeocoderConfig::Coordinate => {
          coordinate_parser = Some(providers::CoordinateParser::new());
        }
        GeocoderConfig::Nominatim { base_url } => {
          providers.push(Arc::new(providers::NominatimProvider::new(
            base_url.clone(),
            limit,
            timeout,
          )));
        }
        GeocoderConfig::Custom {
          name,
          forward_url,
          reverse_url,
          headers,
        } => {
          providers.push(Arc::new(providers::CustomProvider::new(
            name.clone(),
            forward_url.clone(),
            reverse_url.clone(),
            headers.clone(),
            timeout,
          )));
        }
      }
    }

    Self {
      providers,
      coordinate_parser,
    }
  }

  /// Names of the active providers, coordinate parser first.
  #[must_use]
  pub fn provider_names(&self) -> Vec<String> {
    self
      .coordinate_parser
      .iter()
      .map(|_| "Coordinates".to_string())
      .chain(self.providers.iter().map(|p| p.name().to_string()))
      .collect()
  }
}

#[async_trait::async_trait]
impl Geocoder for GeocodingService {
  fn name(&self) -> &'static str {
    "Geocoding service"
  }

  async fn forward(&self, query: &str) -> Result<Vec<WGS84Coordinate>, GeocodeError> {
    if let Some(coord) = self
      .coordinate_parser
      .as_ref()
      .and_then(|p| p.parse_coordinate(query))
    {
      debug!("Parsed coordinate input: '{query}' -> {coord}");
      return Ok(vec![coord]);
    }

    let mut last_error = GeocodeError::NoProvider;
    for provider in &self.providers {
      match provider.forward(query).await {
        Ok(results) => {
          debug!(
            "Provider '{}' returned {} results for '{query}'",
            provider.name(),
            results.len()
          );
          return Ok(results);
        }
        Err(e) => {
          warn!("Geocoding provider '{}' failed: {e}", provider.name());
          last_error = e;
        }
      }
    }
    Err(last_error)
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Vec<AddressComponents>, GeocodeError> {
    let mut last_error = GeocodeError::NoProvider;
    for provider in &self.providers {
      match provider.reverse(coord).await {
        Ok(results) => return Ok(results),
        Err(e) => {
          warn!("Reverse geocoding with '{}' failed: {e}", provider.name());
          last_error = e;
        }
      }
    }
    Err(last_error)
  }
}
