//! Access to the device position.

use log::debug;
use thiserror::Error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
  Granted,
  Denied,
}

#[derive(Error, Debug)]
pub enum LocationError {
  #[error("Device position unavailable: {0}")]
  Unavailable(String),
}

/// Where the device currently is, and whether we are allowed to ask.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
  async fn request_permission(&self) -> PermissionStatus;

  async fn current_position(&self) -> Result<WGS84Coordinate, LocationError>;
}

/// Reports a position fixed by configuration. Without one, permission is denied.
#[derive(Debug, Clone, Default)]
pub struct StaticLocationProvider {
  position: Option<WGS84Coordinate>,
}

impl StaticLocationProvider {
  #[must_use]
  pub fn new(position: Option<WGS84Coordinate>) -> Self {
    Self { position }
  }
}

#[async_trait::async_trait]
impl LocationProvider for StaticLocationProvider {
  async fn request_permission(&self) -> PermissionStatus {
    if self.position.is_some() {
      PermissionStatus::Granted
    } else {
      debug!("No device location configured, denying permission");
      PermissionStatus::Denied
    }
  }

  async fn current_position(&self) -> Result<WGS84Coordinate, LocationError> {
    self
      .position
      .ok_or_else(|| LocationError::Unavailable("no device location configured".to_string()))
  }
}
