use super::{AddressComponents, GeocodeError, Geocoder};
use crate::map::coordinates::WGS84Coordinate;
use log::{debug, error};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

const USER_AGENT: &str = concat!("Binder/", env!("CARGO_PKG_VERSION"));
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
/// Nominatim refuses to return more than this many search hits.
const NOMINATIM_MAX_LIMIT: usize = 40;

// Matches: "52.5, 13.4" or "52.5,13.4" or "52.5 13.4"
static DECIMAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\s*(-?\d+\.?\d*)\s*[,\s]\s*(-?\d+\.?\d*)\s*$").expect("valid decimal regex")
});
// Matches: "52°30'N 13°24'E" or "52° 30' N, 13° 24' E"
static DMS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\s*(\d+)°\s*(\d+)'\s*([NS])\s*[,\s]\s*(\d+)°\s*(\d+)'\s*([EW])\s*$")
    .expect("valid dms regex")
});

/// Recognizes typed coordinates so they resolve without a network round trip.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordinateParser;

impl CoordinateParser {
  #[must_use]
  pub fn new() -> Self {
    Self
  }

  /// Try decimal degrees, then degrees/minutes.
  #[must_use]
  pub fn parse_coordinate(&self, input: &str) -> Option<WGS84Coordinate> {
    Self::parse_decimal(input)
      .or_else(|| Self::parse_dms(input))
      .filter(WGS84Coordinate::is_valid)
  }

  fn parse_decimal(input: &str) -> Option<WGS84Coordinate> {
    let caps = DECIMAL_REGEX.captures(input)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(WGS84Coordinate::new(lat, lon))
  }

  fn parse_dms(input: &str) -> Option<WGS84Coordinate> {
    let caps = DMS_REGEX.captures(input)?;
    let part = |i: usize| -> Option<f64> { caps.get(i)?.as_str().parse().ok() };

    let mut lat = part(1)? + part(2)? / 60.0;
    let mut lon = part(4)? + part(5)? / 60.0;
    if caps.get(3)?.as_str() == "S" {
      lat = -lat;
    }
    if caps.get(6)?.as_str() == "W" {
      lon = -lon;
    }
    Some(WGS84Coordinate::new(lat, lon))
  }
}

fn http_client(timeout: Duration) -> surf::Client {
  surf::Config::new()
    .set_timeout(Some(timeout))
    .try_into()
    .unwrap_or_else(|e| {
      error!("Failed to configure http client, using defaults: {e}");
      surf::Client::new()
    })
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
  lat: String,
  lon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
  road: Option<String>,
  city: Option<String>,
  town: Option<String>,
  village: Option<String>,
  hamlet: Option<String>,
  state: Option<String>,
  country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimReverse {
  name: Option<String>,
  address: Option<NominatimAddress>,
  error: Option<String>,
}

impl From<NominatimReverse> for AddressComponents {
  fn from(reverse: NominatimReverse) -> Self {
    let address = reverse.address.unwrap_or_default();
    AddressComponents {
      name: reverse.name,
      street: address.road,
      city: address
        .city
        .or(address.town)
        .or(address.village)
        .or(address.hamlet),
      region: address.state,
      country: address.country,
    }
  }
}

/// OpenStreetMap Nominatim provider (free)
pub struct NominatimProvider {
  base_url: String,
  limit: usize,
  client: surf::Client,
}

impl NominatimProvider {
  /// `limit` is the number of search hits requested, clamped to what Nominatim serves.
  #[must_use]
  pub fn new(base_url: Option<String>, limit: usize, timeout: Duration) -> Self {
    Self {
      base_url: base_url.unwrap_or_else(|| NOMINATIM_URL.to_string()),
      limit: limit.clamp(1, NOMINATIM_MAX_LIMIT),
      client: http_client(timeout),
    }
  }

  fn search_url(&self, query: &str) -> String {
    format!(
      "{}/search?format=json&limit={}&q={}",
      self.base_url,
      self.limit,
      urlencoding::encode(query)
    )
  }

  fn request_error(&self, e: &surf::Error) -> GeocodeError {
    GeocodeError::Request {
      provider: self.name().to_string(),
      message: e.to_string(),
    }
  }
}

#[async_trait::async_trait]
impl Geocoder for NominatimProvider {
  fn name(&self) -> &'static str {
    "OpenStreetMap Nominatim"
  }

  async fn forward(&self, query: &str) -> Result<Vec<WGS84Coordinate>, GeocodeError> {
    let url = self.search_url(query);
    debug!("Nominatim search: {url}");

    let places: Vec<NominatimPlace> = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json()
      .await
      .map_err(|e| self.request_error(&e))?;

    Ok(
      places
        .iter()
        .filter_map(|p| {
          Some(WGS84Coordinate::new(
            p.lat.parse().ok()?,
            p.lon.parse().ok()?,
          ))
        })
        .collect(),
    )
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Vec<AddressComponents>, GeocodeError> {
    let url = format!(
      "{}/reverse?format=json&lat={}&lon={}&addressdetails=1",
      self.base_url, coord.lat, coord.lon
    );
    debug!("Nominatim reverse: {url}");

    let reverse: NominatimReverse = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json()
      .await
      .map_err(|e| self.request_error(&e))?;

    if let Some(message) = reverse.error {
      debug!("Nominatim could not name {coord}: {message}");
      return Ok(vec![]);
    }
    Ok(vec![reverse.into()])
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeatureCollection {
  features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
  geometry: Geometry,
  #[serde(default)]
  properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
  coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeatureProperties {
  name: Option<String>,
  street: Option<String>,
  city: Option<String>,
  state: Option<String>,
  country: Option<String>,
}

impl Feature {
  fn coordinate(&self) -> Option<WGS84Coordinate> {
    match self.geometry.coordinates.as_slice() {
      [lon, lat, ..] => Some(WGS84Coordinate::new(*lat, *lon)),
      _ => None,
    }
  }
}

impl From<FeatureProperties> for AddressComponents {
  fn from(props: FeatureProperties) -> Self {
    AddressComponents {
      name: props.name,
      street: props.street,
      city: props.city,
      region: props.state,
      country: props.country,
    }
  }
}

/// GeoJSON geocoding API (Photon and friends) addressed through URL templates.
///
/// `forward_url` must contain `{query}`, `reverse_url` `{lat}` and `{lon}`.
pub struct CustomProvider {
  name: String,
  forward_url: String,
  reverse_url: Option<String>,
  headers: HashMap<String, String>,
  client: surf::Client,
}

impl CustomProvider {
  #[must_use]
  pub fn new(
    name: String,
    forward_url: String,
    reverse_url: Option<String>,
    headers: Option<HashMap<String, String>>,
    timeout: Duration,
  ) -> Self {
    Self {
      name,
      forward_url,
      reverse_url,
      headers: headers.unwrap_or_default(),
      client: http_client(timeout),
    }
  }

  async fn features(&self, url: &str) -> Result<Vec<Feature>, GeocodeError> {
    let mut request = self.client.get(url);
    for (key, value) in &self.headers {
      request = request.header(key.as_str(), value.as_str());
    }

    let collection: FeatureCollection =
      request
        .recv_json()
        .await
        .map_err(|e| GeocodeError::Request {
          provider: self.name.clone(),
          message: e.to_string(),
        })?;
    Ok(collection.features)
  }
}

#[async_trait::async_trait]
impl Geocoder for CustomProvider {
  fn name(&self) -> &str {
    &self.name
  }

  async fn forward(&self, query: &str) -> Result<Vec<WGS84Coordinate>, GeocodeError> {
    let url = self
      .forward_url
      .replace("{query}", &urlencoding::encode(query));
    let features = self.features(&url).await?;
    Ok(features.iter().filter_map(Feature::coordinate).collect())
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Vec<AddressComponents>, GeocodeError> {
    let Some(template) = &self.reverse_url else {
      return Err(GeocodeError::Response {
        provider: self.name.clone(),
        message: "reverse geocoding not configured".to_string(),
      });
    };
    let url = template
      .replace("{lat}", &coord.lat.to_string())
      .replace("{lon}", &coord.lon.to_string());
    let features = self.features(&url).await?;
    Ok(
      features
        .into_iter()
        .map(|f| AddressComponents::from(f.properties))
        .collect(),
    )
  }
}
