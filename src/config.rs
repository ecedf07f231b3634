use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::records;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Versioned name of the response cache. Bumping it invalidates every
  /// previously cached generation on the next activation.
  pub cache_name: String,
  /// Origin the worker serves for; root-relative paths resolve against it
  pub origin: String,
  /// App shell assets fetched at install time, in order
  pub precache: Vec<String>,
  /// Path segment marking API requests (offline JSON fallback applies)
  pub api_segment: String,
  /// SQLite file backing both stores (defaults to the data directory)
  pub database: Option<PathBuf>,
  pub sync: SyncConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Background sync tag that triggers a flush
  pub tag: String,
  /// Persisted keys flushed when the tag fires
  pub keys: Vec<String>,
  /// Remote base URL receiving flushed records. Without one, entries stay put.
  pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Write logs to a rolling file in the data directory instead of stderr
  pub file: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_name: "maa-sathi-seva-cache-v1".to_string(),
      origin: "http://localhost:8080".to_string(),
      precache: ["/", "/index.html", "/manifest.json", "/favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect(),
      api_segment: "/api/".to_string(),
      database: None,
      sync: SyncConfig::default(),
      logging: LoggingConfig::default(),
    }
  }
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      tag: "sync-health-data".to_string(),
      keys: records::PERSISTED_KEYS
        .iter()
        .map(|k| k.to_string())
        .collect(),
      endpoint: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sathi.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sathi/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("sathi.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sathi").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    url::Url::parse(&config.origin)
      .map_err(|e| eyre!("Invalid origin '{}': {}", config.origin, e))?;
    Ok(config)
  }

  /// Directory holding the database and log files.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("sathi"))
  }

  /// Resolved SQLite path.
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => Ok(Self::data_dir()?.join("offline.db")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_shipped_worker() {
    let config = Config::default();
    assert_eq!(config.cache_name, "maa-sathi-seva-cache-v1");
    assert_eq!(config.precache[0], "/");
    assert_eq!(config.sync.tag, "sync-health-data");
    assert_eq!(config.sync.keys.len(), 6);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml("cache_name: maa-sathi-seva-cache-v2\n").unwrap();
    assert_eq!(config.cache_name, "maa-sathi-seva-cache-v2");
    assert_eq!(config.api_segment, "/api/");
    assert!(config.sync.endpoint.is_none());
  }

  #[test]
  fn test_sync_section() {
    let yaml = "sync:\n  endpoint: https://example.org/sync\n  keys: [alerts]\n";
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.sync.keys, vec!["alerts".to_string()]);
    assert_eq!(config.sync.tag, "sync-health-data");
    assert_eq!(
      config.sync.endpoint.as_deref(),
      Some("https://example.org/sync")
    );
  }

  #[test]
  fn test_invalid_origin_rejected() {
    assert!(Config::from_yaml("origin: not a url\n").is_err());
  }
}
