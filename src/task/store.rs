use std::time::Duration;

use log::{debug, error};
use thiserror::Error;

use super::TaskRecord;

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Request to {collection} failed: {message}")]
  Request { collection: String, message: String },
  #[error("{collection} rejected the insert with status {status}: {body}")]
  Rejected {
    collection: String,
    status: u16,
    body: String,
  },
  #[error("Task store is not configured")]
  NotConfigured,
}

/// Remote table the finished task is written to.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
  async fn insert(&self, collection: &str, record: &TaskRecord) -> Result<(), StoreError>;
}

/// Inserts rows through the PostgREST endpoint of a hosted Supabase project.
pub struct SupabaseStore {
  url: String,
  api_key: String,
  client: surf::Client,
}

impl SupabaseStore {
  #[must_use]
  pub fn new(url: &str, api_key: String, timeout: Duration) -> Self {
    let client: surf::Client = surf::Config::new()
      .set_timeout(Some(timeout))
      .try_into()
      .unwrap_or_else(|e| {
        error!("Failed to configure http client, using defaults: {e}");
        surf::Client::new()
      });
    Self {
      url: url.trim_end_matches('/').to_string(),
      api_key,
      client,
    }
  }

  fn endpoint(&self, collection: &str) -> String {
    format!("{}/rest/v1/{}", self.url, urlencoding::encode(collection))
  }
}

#[async_trait::async_trait]
impl TaskStore for SupabaseStore {
  async fn insert(&self, collection: &str, record: &TaskRecord) -> Result<(), StoreError> {
    let request_error = |message: String| StoreError::Request {
      collection: collection.to_string(),
      message,
    };

    let url = self.endpoint(collection);
    debug!("Inserting into {url}");
    let mut response = self
      .client
      .post(&url)
      .header("apikey", self.api_key.as_str())
      .header("Authorization", format!("Bearer {}", self.api_key))
      .header("Prefer", "return=minimal")
      .body_json(&[record])
      .map_err(|e| request_error(e.to_string()))?
      .await
      .map_err(|e| request_error(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(());
    }
    let body = response.body_string().await.unwrap_or_default();
    Err(StoreError::Rejected {
      collection: collection.to_string(),
      status: status.into(),
      body,
    })
  }
}

/// Store used when no backend is configured; every insert fails.
pub struct UnconfiguredStore;

#[async_trait::async_trait]
impl TaskStore for UnconfiguredStore {
  async fn insert(&self, _collection: &str, _record: &TaskRecord) -> Result<(), StoreError> {
    Err(StoreError::NotConfigured)
  }
}

pub mod test_utils {
  use super::{StoreError, TaskRecord, TaskStore};
  use std::sync::Mutex;

  /// In-memory table, optionally refusing every insert.
  #[derive(Default)]
  pub struct MemoryStore {
    rows: Mutex<Vec<(String, TaskRecord)>>,
    fail: bool,
  }

  impl MemoryStore {
    #[must_use]
    pub fn failing() -> Self {
      Self {
        fail: true,
        ..Self::default()
      }
    }

    #[must_use]
    pub fn rows(&self) -> Vec<(String, TaskRecord)> {
      self.rows.lock().unwrap().clone()
    }
  }

  #[async_trait::async_trait]
  impl TaskStore for MemoryStore {
    async fn insert(&self, collection: &str, record: &TaskRecord) -> Result<(), StoreError> {
      if self.fail {
        return Err(StoreError::Rejected {
          collection: collection.to_string(),
          status: 503,
          body: "unavailable".to_string(),
        });
      }
      self
        .rows
        .lock()
        .unwrap()
        .push((collection.to_string(), record.clone()));
      Ok(())
    }
  }
}
