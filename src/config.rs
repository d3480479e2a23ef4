use crate::tick::DEFAULT_TICK_INTERVAL;

use serde::Deserialize;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "ip-lookup.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(r#"Error while attempting to read config "{path}": {error}"#)]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(r#"api_base "{0}" is not valid: {1}"#)]
    ApiBaseInvalid(String, url::ParseError),
    #[error(r#"api_base "{0}" cannot be used as a base URL"#)]
    ApiBaseNotABase(Url),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_api_base")]
    pub api_base: String,
    #[serde(default = "Config::default_log_level")]
    pub log_level: log::Level,
    /// Milliseconds between clock ticks
    #[serde(default)]
    pub tick_interval: TickIntervalConfig,
    /// Keep printing live clocks after the lookups are done
    #[serde(default)]
    pub watch: bool,
}

impl Config {
    fn default_api_base() -> String {
        "http://localhost:8080".into()
    }

    fn default_log_level() -> log::Level {
        log::Level::Info
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .api_base
            .parse()
            .map_err(|error| ConfigError::ApiBaseInvalid(self.api_base.clone(), error))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::ApiBaseNotABase(url));
        }
        Ok(url)
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval.0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            log_level: Self::default_log_level(),
            tick_interval: TickIntervalConfig::default(),
            watch: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(from = "NonZeroU64")]
pub struct TickIntervalConfig(Duration);

impl Default for TickIntervalConfig {
    fn default() -> Self {
        Self(DEFAULT_TICK_INTERVAL)
    }
}

impl From<NonZeroU64> for TickIntervalConfig {
    fn from(millis: NonZeroU64) -> Self {
        Self(Duration::from_millis(millis.get()))
    }
}

pub fn parse_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let toml_string = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
        path: path.to_owned(),
        error,
    })?;
    let config: Config = toml::from_str(&toml_string)?;
    config.api_base_url()?;
    Ok(config)
}

/// Parses `path`, or the default config file if it exists, or falls back to defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => parse_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => parse_config(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}
