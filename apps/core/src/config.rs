use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::page::{IconPolicy, Page, PageProfile};

pub const DEFAULT_ENDPOINT: &str = "https://azuresearch-usnc.nuget.org/query";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub page_size: u16,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub packages_icon_policy: IconPolicy,
    pub tools_icon_policy: IconPolicy,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: 20,
            request_timeout_ms: 10_000,
            user_agent: format!("nugetfind/{}", env!("CARGO_PKG_VERSION")),
            packages_icon_policy: IconPolicy::RemoteWithFallback,
            tools_icon_policy: IconPolicy::RemoteWithFallback,
            config_path: default_config_path(),
        }
    }
}

impl Config {
    pub fn icon_policy(&self, page: Page) -> IconPolicy {
        match page {
            Page::Packages => self.packages_icon_policy,
            Page::DotnetTools => self.tools_icon_policy,
        }
    }

    pub fn profile(&self, page: Page) -> PageProfile {
        PageProfile::new(page, self.icon_policy(page))
    }
}

/// Per-user data directory for logs and other local state.
pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nugetfind")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nugetfind")
        .join(CONFIG_FILE_NAME)
}

/// Loads the config at `path`, or the default location when `path` is `None`.
/// A missing file yields defaults; `.toml` files are read as TOML and every
/// other extension as JSON5.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !config_path.exists() {
        return Ok(Config {
            config_path,
            ..Config::default()
        });
    }

    let raw = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    let mut cfg = parse(&raw, &config_path)?;
    cfg.config_path = config_path;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    let path = &cfg.config_path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = serde_json::to_string_pretty(cfg)?;
    std::fs::write(path, encoded).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.page_size == 0 || cfg.page_size > 100 {
        return Err(ConfigError::Invalid(
            "page_size must be between 1 and 100".into(),
        ));
    }

    let endpoint = cfg.endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::Invalid(
            "endpoint must be an http(s) url".into(),
        ));
    }

    if cfg.request_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "request_timeout_ms must be greater than zero".into(),
        ));
    }

    Ok(())
}

fn parse(raw: &str, path: &Path) -> Result<Config, ConfigError> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        toml::from_str::<Config>(raw).map_err(|e| e.to_string())
    } else {
        json5::from_str::<Config>(raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
