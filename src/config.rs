//! Application configuration.
//!
//! Settings come from `config.toml` in the working directory, then the
//! environment (a `.env` file is loaded first), then built-in defaults.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";

/// Log filter used when neither RUST_LOG nor config.toml sets one
pub const DEFAULT_LOG_FILTER: &str = "recap=info";

pub const DATABASE_PATH_ENV: &str = "RECAP_DATABASE_PATH";
pub const DATA_DIR_ENV: &str = "DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("could not read config.toml: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid config.toml: {0}")]
  Parse(#[from] toml::de::Error),
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
  pub database: Option<DatabaseConfig>,
  pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
  pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
  /// tracing-subscriber EnvFilter directive, e.g. "recap=debug"
  pub filter: Option<String>,
}

impl AppConfig {
  /// Load `.env` and `config.toml`. A missing config file yields defaults.
  pub fn load() -> Result<Self, ConfigError> {
    let _ = dotenvy::dotenv();

    match std::fs::read_to_string(CONFIG_FILE) {
      Ok(contents) => Self::from_toml_str(&contents),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(e) => Err(e.into()),
    }
  }

  pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(contents)?)
  }

  pub fn log_filter(&self) -> &str {
    self
      .logging
      .as_ref()
      .and_then(|l| l.filter.as_deref())
      .unwrap_or(DEFAULT_LOG_FILTER)
  }

  fn database_path(&self) -> Option<&str> {
    self.database.as_ref().and_then(|db| db.path.as_deref())
  }
}

/// Database path with priority: explicit flag > config.toml > RECAP_DATABASE_PATH > DATA_DIR default
pub fn resolve_database_path(explicit: Option<PathBuf>, config: &AppConfig) -> PathBuf {
  resolve_database_path_with(explicit, config, |key| std::env::var(key).ok())
}

fn resolve_database_path_with(
  explicit: Option<PathBuf>,
  config: &AppConfig,
  env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
  if let Some(path) = explicit {
    tracing::info!("Using database from command line: {}", path.display());
    return path;
  }

  if let Some(path) = config.database_path() {
    tracing::info!("Using database from {}: {}", CONFIG_FILE, path);
    return PathBuf::from(path);
  }

  if let Some(path) = env(DATABASE_PATH_ENV) {
    tracing::info!("Using database from {} env: {}", DATABASE_PATH_ENV, path);
    return PathBuf::from(path);
  }

  let data_dir = env(DATA_DIR_ENV).unwrap_or_else(|| "data".to_string());
  let default = PathBuf::from(data_dir).join("recap.db");
  tracing::info!("Using default database path: {}", default.display());
  default
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_env(_: &str) -> Option<String> {
    None
  }

  #[test]
  fn test_parse_full_config() {
    let config = AppConfig::from_toml_str(
      r#"
      [database]
      path = "/tmp/cards.db"

      [logging]
      filter = "recap=debug"
      "#,
    )
    .unwrap();

    assert_eq!(config.database_path(), Some("/tmp/cards.db"));
    assert_eq!(config.log_filter(), "recap=debug");
  }

  #[test]
  fn test_empty_config_defaults() {
    let config = AppConfig::from_toml_str("").unwrap();
    assert_eq!(config.database_path(), None);
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
  }

  #[test]
  fn test_invalid_config_rejected() {
    assert!(matches!(
      AppConfig::from_toml_str("[database\npath = 1"),
      Err(ConfigError::Parse(_))
    ));
  }

  #[test]
  fn test_explicit_path_wins() {
    let config = AppConfig::from_toml_str("[database]\npath = \"from-config.db\"").unwrap();
    let path = resolve_database_path_with(Some(PathBuf::from("flag.db")), &config, no_env);
    assert_eq!(path, PathBuf::from("flag.db"));
  }

  #[test]
  fn test_config_beats_env() {
    let config = AppConfig::from_toml_str("[database]\npath = \"from-config.db\"").unwrap();
    let path = resolve_database_path_with(None, &config, |_| Some("from-env.db".to_string()));
    assert_eq!(path, PathBuf::from("from-config.db"));
  }

  #[test]
  fn test_env_path() {
    let path = resolve_database_path_with(None, &AppConfig::default(), |key| {
      (key == DATABASE_PATH_ENV).then(|| "from-env.db".to_string())
    });
    assert_eq!(path, PathBuf::from("from-env.db"));
  }

  #[test]
  fn test_default_path_under_data_dir() {
    let path = resolve_database_path_with(None, &AppConfig::default(), no_env);
    assert_eq!(path, PathBuf::from("data/recap.db"));

    let path = resolve_database_path_with(None, &AppConfig::default(), |key| {
      (key == DATA_DIR_ENV).then(|| "/var/lib/recap".to_string())
    });
    assert_eq!(path, PathBuf::from("/var/lib/recap/recap.db"));
  }
}
