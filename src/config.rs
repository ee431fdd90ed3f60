use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dirs::home_dir;
use log::error;
use serde::{Deserialize, Serialize};

use crate::location::StaticLocationProvider;
use crate::map::coordinates::WGS84Coordinate;
use crate::search::controller::SearchSettings;
use crate::search::providers::CoordinateParser;
use crate::search::{GeocoderConfig, GeocodingService};
use crate::task::store::{SupabaseStore, TaskStore, UnconfiguredStore};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Hosted backend the task rows go to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
  pub url: String,
  pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  #[serde(skip)]
  pub config_path: Option<PathBuf>,
  pub geocoders: Vec<GeocoderConfig>,
  pub backend: Option<BackendConfig>,
  pub device_location: Option<WGS84Coordinate>,
  /// `None` leaves the choice to the next layer.
  pub search: Option<SearchSettings>,
  pub http_timeout_secs: Option<u64>,
}

impl Config {
  /// Environment first, then the config file, then defaults.
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file(from_env.config_path.clone());
    Self::layered(from_env, from_file)
  }

  /// Merge the layers. Without a config file a fresh one is seeded from the
  /// defaults only; environment values are never written to disk.
  fn layered(from_env: Self, from_file: Option<Self>) -> Self {
    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&Self::default());

    if from_file.is_none()
      && let Some(config_path) = &merged.config_path
    {
      Self {
        config_path: Some(config_path.clone()),
        ..Self::default()
      }
      .init_cfg_file();
    }

    merged
  }

  fn empty() -> Self {
    Self {
      config_path: None,
      geocoders: Vec::new(),
      backend: None,
      device_location: None,
      search: None,
      http_timeout_secs: None,
    }
  }

  fn from_env() -> Self {
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    let config_path = var("BINDER_CONFIG").map(PathBuf::from);
    let geocoders = var("BINDER_NOMINATIM_URL")
      .map(|url| {
        vec![GeocoderConfig::Nominatim {
          base_url: Some(url),
        }]
      })
      .unwrap_or_default();
    let backend = var("BINDER_SUPABASE_URL").and_then(|url| {
      Some(BackendConfig {
        url,
        api_key: var("BINDER_SUPABASE_KEY")?,
      })
    });
    let device_location = var("BINDER_DEVICE_LOCATION").and_then(|v| {
      let parsed = CoordinateParser::new().parse_coordinate(&v);
      if parsed.is_none() {
        error!("Ignoring unparsable BINDER_DEVICE_LOCATION '{v}'");
      }
      parsed
    });

    Self {
      config_path,
      geocoders,
      backend,
      device_location,
      ..Self::empty()
    }
  }

  /// Fill in what `self` leaves open from `other`.
  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());

    for geocoder in &other.geocoders {
      if !self.geocoders.contains(geocoder) {
        self.geocoders.push(geocoder.clone());
      }
    }

    self.backend = self.backend.or(other.backend.clone());
    self.device_location = self.device_location.or(other.device_location);

    self.search = self.search.or(other.search);
    self.http_timeout_secs = self.http_timeout_secs.or(other.http_timeout_secs);

    self
  }

  fn from_file(config_path: Option<PathBuf>) -> Option<Self> {
    let config_path = config_path.or_else(default_config_dir)?;
    let file = config_path.join("config.json");

    let mut config: Self = serde_json::from_str(&std::fs::read_to_string(&file).ok()?)
      .inspect_err(|e| error!("Failed to read config file {}: {e}", file.display()))
      .ok()?;
    config.config_path = Some(config_path);
    Some(config)
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else {
      return;
    };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }

    let path = path.join("config.json");
    if path.exists() {
      return;
    }
    match serde_json::to_string_pretty(self) {
      Ok(config) => {
        let _ = std::fs::write(path, config).inspect_err(|e| {
          error!("Failed to write config file: {e}");
        });
      }
      Err(e) => error!("Failed to serialize config: {e}"),
    }
  }

  #[must_use]
  pub fn search_settings(&self) -> SearchSettings {
    self.search.unwrap_or_default()
  }

  #[must_use]
  pub fn http_timeout(&self) -> Duration {
    Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
  }

  #[must_use]
  pub fn geocoding_service(&self) -> GeocodingService {
    GeocodingService::with_config(
      &self.geocoders,
      self.search_settings().max_suggestions,
      self.http_timeout(),
    )
  }

  #[must_use]
  pub fn location_provider(&self) -> StaticLocationProvider {
    StaticLocationProvider::new(self.device_location)
  }

  #[must_use]
  pub fn task_store(&self) -> Arc<dyn TaskStore> {
    match &self.backend {
      Some(backend) => Arc::new(SupabaseStore::new(
        &backend.url,
        backend.api_key.clone(),
        self.http_timeout(),
      )),
      None => Arc::new(UnconfiguredStore),
    }
  }
}

fn default_config_dir() -> Option<PathBuf> {
  home_dir().map(|p| p.join(".config").join("binder"))
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_path: default_config_dir(),
      geocoders: vec![
        GeocoderConfig::Coordinate,
        GeocoderConfig::Nominatim { base_url: None },
      ],
      backend: None,
      device_location: None,
      search: Some(SearchSettings::default()),
      http_timeout_secs: Some(DEFAULT_HTTP_TIMEOUT_SECS),
    }
  }
}
