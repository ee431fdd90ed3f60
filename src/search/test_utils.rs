//! Scriptable collaborators for exercising the search controller without a network.

use super::{AddressComponents, GeocodeError, Geocoder};
use crate::location::{LocationError, LocationProvider, PermissionStatus};
use crate::map::camera::MapCamera;
use crate::map::coordinates::{CameraRegion, WGS84Coordinate};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Address with just a name and a country, enough for most label checks.
#[must_use]
pub fn address(name: &str, country: &str) -> AddressComponents {
  AddressComponents {
    name: Some(name.to_string()),
    country: Some(country.to_string()),
    ..AddressComponents::default()
  }
}

fn failure(message: &str) -> GeocodeError {
  GeocodeError::Request {
    provider: "mock".to_string(),
    message: message.to_string(),
  }
}

struct ForwardScript {
  query: String,
  hits: Vec<WGS84Coordinate>,
  delay: Duration,
}

struct ReverseScript {
  coordinate: WGS84Coordinate,
  result: Option<Vec<AddressComponents>>,
  delay: Duration,
}

/// Geocoder answering from scripts. Unknown queries resolve to nothing,
/// unknown coordinates to an empty address list.
#[derive(Default)]
pub struct MockGeocoder {
  forward: Vec<ForwardScript>,
  reverse: Vec<ReverseScript>,
  fail_forward: bool,
  fail_reverse: bool,
  forward_queries: Mutex<Vec<String>>,
  reverse_calls: AtomicUsize,
}

impl MockGeocoder {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_forward(self, query: &str, hits: Vec<WGS84Coordinate>) -> Self {
    self.with_delayed_forward(query, hits, Duration::ZERO)
  }

  #[must_use]
  pub fn with_delayed_forward(
    mut self,
    query: &str,
    hits: Vec<WGS84Coordinate>,
    delay: Duration,
  ) -> Self {
    self.forward.push(ForwardScript {
      query: query.to_string(),
      hits,
      delay,
    });
    self
  }

  #[must_use]
  pub fn with_reverse(self, coordinate: WGS84Coordinate, result: Vec<AddressComponents>) -> Self {
    self.with_delayed_reverse(coordinate, result, Duration::ZERO)
  }

  #[must_use]
  pub fn with_delayed_reverse(
    mut self,
    coordinate: WGS84Coordinate,
    result: Vec<AddressComponents>,
    delay: Duration,
  ) -> Self {
    self.reverse.push(ReverseScript {
      coordinate,
      result: Some(result),
      delay,
    });
    self
  }

  #[must_use]
  pub fn failing_reverse_at(mut self, coordinate: WGS84Coordinate) -> Self {
    self.reverse.push(ReverseScript {
      coordinate,
      result: None,
      delay: Duration::ZERO,
    });
    self
  }

  #[must_use]
  pub fn failing_forward(mut self) -> Self {
    self.fail_forward = true;
    self
  }

  #[must_use]
  pub fn failing_reverse(mut self) -> Self {
    self.fail_reverse = true;
    self
  }

  /// Queries that reached `forward`, in call order.
  #[must_use]
  pub fn forward_queries(&self) -> Vec<String> {
    self.forward_queries.lock().unwrap().clone()
  }

  #[must_use]
  pub fn forward_calls(&self) -> usize {
    self.forward_queries.lock().unwrap().len()
  }

  #[must_use]
  pub fn reverse_calls(&self) -> usize {
    self.reverse_calls.load(Ordering::SeqCst)
  }

  #[must_use]
  pub fn network_calls(&self) -> usize {
    self.forward_calls() + self.reverse_calls()
  }
}

#[async_trait::async_trait]
impl Geocoder for MockGeocoder {
  fn name(&self) -> &'static str {
    "mock"
  }

  async fn forward(&self, query: &str) -> Result<Vec<WGS84Coordinate>, GeocodeError> {
    self.forward_queries.lock().unwrap().push(query.to_string());
    if self.fail_forward {
      return Err(failure("forward unavailable"));
    }
    let Some(script) = self.forward.iter().find(|s| s.query == query) else {
      return Ok(vec![]);
    };
    tokio::time::sleep(script.delay).await;
    Ok(script.hits.clone())
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Vec<AddressComponents>, GeocodeError> {
    self.reverse_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_reverse {
      return Err(failure("reverse unavailable"));
    }
    let Some(script) = self.reverse.iter().find(|s| s.coordinate == coord) else {
      return Ok(vec![]);
    };
    tokio::time::sleep(script.delay).await;
    script
      .result
      .clone()
      .ok_or_else(|| failure("no address here"))
  }
}

/// Camera remembering every region it was asked to show.
#[derive(Default)]
pub struct RecordingCamera {
  regions: Mutex<Vec<CameraRegion>>,
}

impl RecordingCamera {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn regions(&self) -> Vec<CameraRegion> {
    self.regions.lock().unwrap().clone()
  }

  #[must_use]
  pub fn animations(&self) -> usize {
    self.regions.lock().unwrap().len()
  }
}

impl MapCamera for RecordingCamera {
  fn animate_to(&self, region: CameraRegion, _duration: Duration) {
    self.regions.lock().unwrap().push(region);
  }
}

/// Device location with a fixed answer and call counters.
pub struct MockLocation {
  permission: PermissionStatus,
  position: Option<WGS84Coordinate>,
  permission_requests: AtomicUsize,
  position_reads: AtomicUsize,
}

impl MockLocation {
  #[must_use]
  pub fn at(position: WGS84Coordinate) -> Self {
    Self {
      permission: PermissionStatus::Granted,
      position: Some(position),
      permission_requests: AtomicUsize::new(0),
      position_reads: AtomicUsize::new(0),
    }
  }

  #[must_use]
  pub fn denied() -> Self {
    Self {
      permission: PermissionStatus::Denied,
      position: None,
      permission_requests: AtomicUsize::new(0),
      position_reads: AtomicUsize::new(0),
    }
  }

  /// Permission granted but no fix available.
  #[must_use]
  pub fn unavailable() -> Self {
    Self {
      permission: PermissionStatus::Granted,
      ..Self::denied()
    }
  }

  #[must_use]
  pub fn permission_requests(&self) -> usize {
    self.permission_requests.load(Ordering::SeqCst)
  }

  #[must_use]
  pub fn position_reads(&self) -> usize {
    self.position_reads.load(Ordering::SeqCst)
  }
}

#[async_trait::async_trait]
impl LocationProvider for MockLocation {
  async fn request_permission(&self) -> PermissionStatus {
    self.permission_requests.fetch_add(1, Ordering::SeqCst);
    self.permission
  }

  async fn current_position(&self) -> Result<WGS84Coordinate, LocationError> {
    self.position_reads.fetch_add(1, Ordering::SeqCst);
    self
      .position
      .ok_or_else(|| LocationError::Unavailable("mock has no fix".to_string()))
  }
}
