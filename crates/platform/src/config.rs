use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PlatformError;

pub const ENV_BASE_URL: &str = "TRADING_PLATFORM_BASE_URL";
pub const ENV_COMPANY: &str = "TRADING_PLATFORM_COMPANY";
pub const ENV_USERNAME: &str = "TRADING_PLATFORM_USERNAME";
pub const ENV_PASSWORD: &str = "TRADING_PLATFORM_PASSWORD";
pub const ENV_TOKEN_CACHE: &str = "TRADING_PLATFORM_TOKEN_CACHE";
pub const ENV_TOKEN_TTL_HOURS: &str = "TRADING_PLATFORM_TOKEN_TTL_HOURS";

/// Longest token validity accepted from configuration (one year).
pub const MAX_TOKEN_VALIDITY_HOURS: i64 = 24 * 366;

/// Connection settings for the trading-platform API.
#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API root, e.g. "https://platform.example.com".
    pub base_url: String,
    /// Company name sent on login.
    pub company_name: String,
    /// Service user name sent on login.
    pub user_name: String,
    pub password: String,
    /// File holding the cached bearer token.
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: PathBuf,
    /// How long a freshly issued token is trusted.
    #[serde(default = "default_token_validity_hours")]
    pub token_validity_hours: i64,
    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_token_cache_path() -> PathBuf {
    PathBuf::from("data/platform-token.json")
}

fn default_token_validity_hours() -> i64 {
    24
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl PlatformConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing required keys are fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlatformError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PlatformError::Config(format!("{} is not set", key)))
        };

        let token_validity_hours = match lookup(ENV_TOKEN_TTL_HOURS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PlatformError::Config(format!("{} must be an integer, got {:?}", ENV_TOKEN_TTL_HOURS, raw))
            })?,
            None => default_token_validity_hours(),
        };

        let config = Self {
            base_url: required(ENV_BASE_URL)?,
            company_name: required(ENV_COMPANY)?,
            user_name: required(ENV_USERNAME)?,
            password: required(ENV_PASSWORD)?,
            token_cache_path: lookup(ENV_TOKEN_CACHE)
                .map(PathBuf::from)
                .unwrap_or_else(default_token_cache_path),
            token_validity_hours,
            request_timeout_secs: default_request_timeout_secs(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PlatformError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PlatformError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| PlatformError::Config(format!("Invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlatformError> {
        let fields = [
            ("base_url", &self.base_url),
            ("company_name", &self.company_name),
            ("user_name", &self.user_name),
            ("password", &self.password),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(PlatformError::Config(format!("{} must not be empty", name)));
            }
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PlatformError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if !(1..=MAX_TOKEN_VALIDITY_HOURS).contains(&self.token_validity_hours) {
            return Err(PlatformError::Config(format!(
                "token_validity_hours must be between 1 and {}, got {}",
                MAX_TOKEN_VALIDITY_HOURS, self.token_validity_hours
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("company_name", &self.company_name)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("token_cache_path", &self.token_cache_path)
            .field("token_validity_hours", &self.token_validity_hours)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
