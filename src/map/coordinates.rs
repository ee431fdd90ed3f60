use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Latitude span used whenever the camera focuses a single point.
pub const FOCUS_LATITUDE_DELTA: f64 = 0.0922;
/// Longitude span used whenever the camera focuses a single point.
pub const FOCUS_LONGITUDE_DELTA: f64 = 0.0421;

/// The standard WGS84 coordinate system.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f64,
  #[serde(alias = "longitude")]
  pub lon: f64,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
  }

  /// Fixed four decimal rendering, used as the label of a point nobody could name.
  #[must_use]
  pub fn fixed_label(&self) -> String {
    format!("{:.4}, {:.4}", self.lat, self.lon)
  }
}

impl Display for WGS84Coordinate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:.4}°, {:.4}°", self.lat, self.lon)
  }
}

/// The visible part of the map, given as a center and its extent in degrees.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRegion {
  pub center: WGS84Coordinate,
  pub latitude_delta: f64,
  pub longitude_delta: f64,
}

impl CameraRegion {
  /// Region around `center` with the fixed zoom span.
  #[must_use]
  pub fn focused_on(center: WGS84Coordinate) -> Self {
    Self {
      center,
      latitude_delta: FOCUS_LATITUDE_DELTA,
      longitude_delta: FOCUS_LONGITUDE_DELTA,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixed_label_rounds_to_four_decimals() {
    let coord = WGS84Coordinate::new(37.1234, -122.4567);
    assert_eq!(coord.fixed_label(), "37.1234, -122.4567");

    let coord = WGS84Coordinate::new(1.0, 2.123_456);
    assert_eq!(coord.fixed_label(), "1.0000, 2.1235");
  }

  #[test]
  fn validity() {
    assert!(WGS84Coordinate::new(52.5, 13.4).is_valid());
    assert!(WGS84Coordinate::new(-90.0, 180.0).is_valid());
    assert!(!WGS84Coordinate::new(91.0, 0.0).is_valid());
    assert!(!WGS84Coordinate::new(0.0, -180.5).is_valid());
  }

  #[test]
  fn accepts_long_field_names() {
    let coord: WGS84Coordinate =
      serde_json::from_str(r#"{"latitude": 48.85, "longitude": 2.35}"#).unwrap();
    assert_eq!(coord, WGS84Coordinate::new(48.85, 2.35));
  }
}
