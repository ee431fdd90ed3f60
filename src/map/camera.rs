use std::sync::mpsc::Sender;
use std::time::Duration;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::coordinates::CameraRegion;

/// Duration of every camera animation triggered by a selection.
pub const FOCUS_ANIMATION: Duration = Duration::from_millis(1000);

/// Moves the visible map region. Fire and forget: nothing is returned to the caller.
pub trait MapCamera: Send + Sync {
  fn animate_to(&self, region: CameraRegion, duration: Duration);
}

/// Stuff to be sent to the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
  FocusOn {
    region: CameraRegion,
    duration_ms: u64,
  },
}

/// A camera that forwards every animation as a [`MapEvent`] to whoever renders the map.
#[derive(Debug, Clone)]
pub struct ChannelCamera {
  sender: Sender<MapEvent>,
}

impl ChannelCamera {
  #[must_use]
  pub fn new(sender: Sender<MapEvent>) -> Self {
    Self { sender }
  }
}

impl MapCamera for ChannelCamera {
  fn animate_to(&self, region: CameraRegion, duration: Duration) {
    debug!(
      "Focusing map on {} over {}ms",
      region.center,
      duration.as_millis()
    );
    let event = MapEvent::FocusOn {
      region,
      duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    };
    if let Err(e) = self.sender.send(event) {
      error!("Failed to send FocusOn event: {e}");
    }
  }
}
