//! Client configuration.
//!
//! Configuration can be built in code or loaded from an INI file:
//!
//! ```ini
//! [cache]
//! dir = ~/.cache/httpstash
//! max_bytes = 3221225472
//! mode = cache-else-network
//! valid = 1h
//!
//! [network]
//! timeout_secs = 60
//! download_timeout_secs = 1800
//! max_redirects = 20
//! user_agent = httpstash/0.3
//! ```
//!
//! Keys that are absent keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::{CacheMode, ValidDuration, DEFAULT_MAX_SIZE_BYTES};
use crate::executor::DEFAULT_MAX_REDIRECTS;

/// Default timeout for cached requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for downloads, which may stream for a long time.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the response store.
    pub cache_dir: PathBuf,
    /// Byte budget of the response store.
    pub cache_max_bytes: u64,
    /// Mode used when a request sets none.
    pub default_cache_mode: CacheMode,
    /// Freshness window used when a request sets none.
    pub default_valid_duration: ValidDuration,
    /// Timeout for cached requests.
    pub timeout: Duration,
    /// Timeout for downloads.
    pub download_timeout: Duration,
    /// Maximum redirect hops per call.
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_max_bytes: DEFAULT_MAX_SIZE_BYTES,
            default_cache_mode: CacheMode::default(),
            default_valid_duration: ValidDuration::default(),
            timeout: DEFAULT_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("httpstash/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `<platform cache dir>/httpstash`, or `./.httpstash-cache` when the
/// platform has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("httpstash"))
        .unwrap_or_else(|| PathBuf::from(".httpstash-cache"))
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_cache_max_bytes(mut self, bytes: u64) -> Self {
        self.cache_max_bytes = bytes;
        self
    }

    pub fn with_default_cache_mode(mut self, mode: CacheMode) -> Self {
        self.default_cache_mode = mode;
        self
    }

    pub fn with_default_valid_duration(mut self, valid: ValidDuration) -> Self {
        self.default_valid_duration = valid;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load configuration from an INI file on top of the defaults.
    pub fn from_ini_file(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Load configuration from INI text on top of the defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(dir) = section.get("dir") {
                config.cache_dir = expand_tilde(dir.trim());
            }
            if let Some(value) = section.get("max_bytes") {
                config.cache_max_bytes = parse_number("cache", "max_bytes", value)?;
            }
            if let Some(value) = section.get("mode") {
                config.default_cache_mode = value.parse().map_err(|reason| invalid("cache", "mode", value, reason))?;
            }
            if let Some(value) = section.get("valid") {
                config.default_valid_duration =
                    value.parse().map_err(|reason| invalid("cache", "valid", value, reason))?;
            }
        }

        if let Some(section) = ini.section(Some("network")) {
            if let Some(value) = section.get("timeout_secs") {
                config.timeout = Duration::from_secs(parse_number("network", "timeout_secs", value)?);
            }
            if let Some(value) = section.get("download_timeout_secs") {
                config.download_timeout =
                    Duration::from_secs(parse_number("network", "download_timeout_secs", value)?);
            }
            if let Some(value) = section.get("max_redirects") {
                config.max_redirects = parse_number("network", "max_redirects", value)?;
            }
            if let Some(value) = section.get("user_agent") {
                config.user_agent = value.trim().to_string();
            }
        }

        Ok(config)
    }
}

fn parse_number<T>(section: &'static str, key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, e.to_string()))
}

fn invalid(section: &'static str, key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason,
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
