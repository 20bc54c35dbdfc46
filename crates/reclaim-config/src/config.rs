use crate::error::ConfigError;
use crate::paths::PathManager;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

pub const ENV_TRAKT_API_KEY: &str = "TRAKT_API_KEY";
pub const ENV_TRAKT_CLIENT_SECRET: &str = "TRAKT_CLIENT_SECRET";
pub const ENV_TRAKT_API_URL: &str = "TRAKT_API_URL";
pub const ENV_SONARR_API_KEY: &str = "SONARR_API_KEY";
pub const ENV_SONARR_URL: &str = "SONARR_URL";
pub const ENV_TOKEN_PATH: &str = "TOKEN_PATH";
pub const ENV_WINDOW_DAYS: &str = "RECLAIM_WINDOW_DAYS";

/// Optional TOML file. Every key mirrors an environment variable; the
/// environment wins when both are set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub trakt: TraktSection,
    #[serde(default)]
    pub sonarr: SonarrSection,
    pub token_path: Option<PathBuf>,
    pub window_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraktSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SonarrSection {
    pub api_key: Option<String>,
    pub url: Option<String>,
}

impl FileConfig {
    fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone)]
pub struct TraktSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: Url,
}

#[derive(Clone)]
pub struct SonarrSettings {
    pub api_key: String,
    pub url: Url,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub trakt: TraktSettings,
    pub sonarr: SonarrSettings,
    pub token_dir: PathBuf,
    pub window_days: u32,
}

impl Settings {
    /// Reads the optional config file, then the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve(FileConfig::load_optional(config_file)?, |key| std::env::var(key).ok())
    }

    /// Resolves only the token location. Commands that never reach a
    /// service use this so they work without credentials configured.
    pub fn load_paths(config_file: Option<&Path>) -> Result<PathManager, ConfigError> {
        let file = FileConfig::load_optional(config_file)?;
        Ok(PathManager::new(resolve_token_dir(file.token_path, |key| std::env::var(key).ok())))
    }

    /// Merges `file` with values returned by `lookup`. Empty values count as unset.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, fallback: Option<String>| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or(fallback.filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim().to_string())
        };
        let require = |key: &'static str, toml_key: &'static str, fallback: Option<String>| {
            pick(key, fallback).ok_or(ConfigError::Missing { key, toml_key })
        };

        let client_id = require(ENV_TRAKT_API_KEY, "trakt.client_id", file.trakt.client_id)?;
        let client_secret = require(
            ENV_TRAKT_CLIENT_SECRET,
            "trakt.client_secret",
            file.trakt.client_secret,
        )?;
        let trakt_url = pick(ENV_TRAKT_API_URL, file.trakt.api_url)
            .unwrap_or_else(|| DEFAULT_TRAKT_API_URL.to_string());
        let sonarr_api_key = require(ENV_SONARR_API_KEY, "sonarr.api_key", file.sonarr.api_key)?;
        let sonarr_url = require(ENV_SONARR_URL, "sonarr.url", file.sonarr.url)?;

        let token_dir = resolve_token_dir(file.token_path, &lookup);

        let window_days = match pick(ENV_WINDOW_DAYS, None) {
            Some(raw) => parse_days(ENV_WINDOW_DAYS, &raw)?,
            None => file.window_days.unwrap_or(DEFAULT_WINDOW_DAYS),
        };
        if window_days == 0 {
            return Err(ConfigError::InvalidDays {
                key: ENV_WINDOW_DAYS,
                value: "0".to_string(),
            });
        }

        Ok(Self {
            trakt: TraktSettings {
                client_id,
                client_secret,
                api_url: parse_url(ENV_TRAKT_API_URL, &trakt_url)?,
            },
            sonarr: SonarrSettings {
                api_key: sonarr_api_key,
                url: parse_url(ENV_SONARR_URL, &sonarr_url)?,
            },
            token_dir,
            window_days,
        })
    }

    pub fn paths(&self) -> PathManager {
        PathManager::new(self.token_dir.clone())
    }
}

fn resolve_token_dir<F>(file_value: Option<PathBuf>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(ENV_TOKEN_PATH).filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir.trim()),
        None => file_value.unwrap_or_else(|| PathManager::default().token_dir().to_path_buf()),
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        source,
    })
}

fn parse_days(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidDays {
        key,
        value: value.to_string(),
    })
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", secret.chars().take(4).collect::<String>())
    }
}

impl fmt::Debug for TraktSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraktSettings")
            .field("client_id", &mask(&self.client_id))
            .field("client_secret", &"****")
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl fmt::Debug for SonarrSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarrSettings")
            .field("api_key", &mask(&self.api_key))
            .field("url", &self.url.as_str())
            .finish()
    }
}
