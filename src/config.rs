use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::project::DisplayOptions;

/// Environment variable read for the API token when `api.token_env` is unset.
pub const DEFAULT_TOKEN_ENV: &str = "PAGECACHE_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub paging: PagingConfig,
  #[serde(default)]
  pub display: DisplayOptions,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every resource path is joined onto
  pub url: String,
  /// Environment variable holding a bearer token
  pub token_env: Option<String>,
  /// HTTP-layer timeout; the cache itself enforces none
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

impl ApiConfig {
  /// Base URL with a trailing slash so resource paths join under it.
  pub fn base_url(&self) -> Result<Url> {
    let mut raw = self.url.trim().to_string();
    if !raw.ends_with('/') {
      raw.push('/');
    }
    Url::parse(&raw).map_err(|e| eyre!("Invalid api.url '{}': {}", self.url, e))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
  /// Rows per page, 0 fetches the whole collection at once
  #[serde(default = "default_page_size")]
  pub page_size: usize,
}

fn default_page_size() -> usize {
  10
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Write logs to a file in this directory instead of stderr
  pub dir: Option<PathBuf>,
  /// EnvFilter directive, e.g. "pagecache=debug"
  pub filter: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pagecache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pagecache/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pagecache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pagecache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pagecache").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty"));
    }
    self.api.base_url()?;
    Ok(())
  }

  /// Get the API token from the environment, if one is set.
  ///
  /// Reads `api.token_env`, falling back to PAGECACHE_TOKEN.
  pub fn get_api_token(api: &ApiConfig) -> Option<String> {
    let var = api.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV);
    std::env::var(var).ok().filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  url: https://example.test/api\n").unwrap();
    assert_eq!(config.paging.page_size, 10);
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.display, DisplayOptions::default());
    assert!(config.log.dir.is_none());
    assert_eq!(
      config.api.base_url().unwrap().as_str(),
      "https://example.test/api/"
    );
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: https://example.test/
  token_env: MY_TOKEN
  timeout_secs: 5
paging:
  page_size: 0
display:
  date_format: "%Y-%m-%d"
  today_label: Hoy
  yesterday_label: Ayer
log:
  dir: /tmp/pagecache
  filter: pagecache=debug
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.paging.page_size, 0);
    assert_eq!(config.api.token_env.as_deref(), Some("MY_TOKEN"));
    assert_eq!(config.display.today_label, "Hoy");
    assert_eq!(config.display.yesterday_label, "Ayer");
    assert_eq!(config.log.filter.as_deref(), Some("pagecache=debug"));
  }

  #[test]
  fn test_invalid_url_is_rejected() {
    assert!(Config::from_yaml("api:\n  url: \"\"\n").is_err());
    assert!(Config::from_yaml("api:\n  url: not a url\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/pagecache.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
