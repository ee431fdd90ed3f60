pub mod store;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notice::Notice;
use crate::search::SelectedLocation;

pub use store::{StoreError, SupabaseStore, TaskStore};

/// Table every task is inserted into.
pub const TASKS_COLLECTION: &str = "Tasks";

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("Missing user name")]
  MissingName,
  #[error("Missing task title")]
  MissingTitle,
  #[error("Storing task failed: {0}")]
  Store(#[from] StoreError),
}

impl TaskError {
  #[must_use]
  pub fn notice(&self) -> Notice {
    match self {
      TaskError::MissingName => Notice::new("Validation Error", "Please enter your name"),
      TaskError::MissingTitle => Notice::new("Validation Error", "Please enter a task title"),
      TaskError::Store(_) => Notice::new("Error", "Failed to add task. Please try again."),
    }
  }
}

/// Location column of a task row. Coordinates stay empty until a point is chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLocation {
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub address: String,
}

impl From<SelectedLocation> for TaskLocation {
  fn from(selected: SelectedLocation) -> Self {
    Self {
      latitude: Some(selected.latitude),
      longitude: Some(selected.longitude),
      address: selected.address,
    }
  }
}

/// A row of the tasks table, in the column naming the table uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
  pub user_name: String,
  pub task_title: String,
  pub location: TaskLocation,
  pub description: String,
}

/// The task creation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
  pub user_name: String,
  pub task_title: String,
  pub description: String,
  pub location: TaskLocation,
}

impl TaskForm {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Attach the location chosen in the search controller, or detach it.
  pub fn set_location(&mut self, selected: Option<&SelectedLocation>) {
    self.location = selected.cloned().map(TaskLocation::from).unwrap_or_default();
  }

  pub fn validate(&self) -> Result<(), TaskError> {
    if self.user_name.trim().is_empty() {
      return Err(TaskError::MissingName);
    }
    if self.task_title.trim().is_empty() {
      return Err(TaskError::MissingTitle);
    }
    Ok(())
  }

  #[must_use]
  pub fn record(&self) -> TaskRecord {
    TaskRecord {
      user_name: self.user_name.clone(),
      task_title: self.task_title.clone(),
      location: self.location.clone(),
      description: self.description.clone(),
    }
  }

  /// Validate and insert the task. The form is cleared only when the insert succeeds,
  /// so a failed submission can be retried as is.
  pub async fn submit(&mut self, store: &dyn TaskStore) -> Result<TaskRecord, TaskError> {
    self.validate()?;

    let record = self.record();
    if let Err(e) = store.insert(TASKS_COLLECTION, &record).await {
      error!("Error adding task: {e}");
      return Err(e.into());
    }

    info!("Task '{}' added", record.task_title);
    *self = Self::default();
    Ok(record)
  }
}
