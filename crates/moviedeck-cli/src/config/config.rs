//! `AppConfig` struct and TOML read/write.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use moviedeck_api::tmdb::{
    CatalogSettings, DEFAULT_BASE_URL, DEFAULT_GENRES_TTL, DEFAULT_INITIAL_DELAY,
    DEFAULT_LANGUAGE, DEFAULT_MAX_RETRIES, DEFAULT_TOP_RATED_TTL, RetryPolicy,
};
use serde::{Deserialize, Serialize};

/// Environment variable that, when set, supplies the bearer token.
pub const TOKEN_ENV_VAR: &str = "TMDB_API_TOKEN";

/// Placeholder written in place of the token by [`AppConfig::redacted`].
const REDACTED: &str = "<redacted>";

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// TMDB endpoint and credentials.
    #[serde(default)]
    pub tmdb: TmdbConfig,
    /// Retry policy of the API client.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// TMDB endpoint configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TmdbConfig {
    /// API base URL.
    pub base_url: String,
    /// Response language sent with every request.
    pub language: String,
    /// Bearer token; `TMDB_API_TOKEN` takes precedence when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            language: String::from(DEFAULT_LANGUAGE),
            api_token: None,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call (0 is treated as 1).
    pub max_retries: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: u64::try_from(DEFAULT_INITIAL_DELAY.as_millis()).unwrap_or(1000),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether responses are cached in memory.
    pub enabled: bool,
    /// Genre list TTL in seconds.
    pub genres_ttl_secs: u64,
    /// Top-rated page TTL in seconds.
    pub top_rated_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            genres_ttl_secs: DEFAULT_GENRES_TTL.as_secs(),
            top_rated_ttl_secs: DEFAULT_TOP_RATED_TTL.as_secs(),
        }
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Serializes the config as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config to TOML")
    }

    /// Returns a copy safe to display, with the token masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            tmdb: TmdbConfig {
                base_url: self.tmdb.base_url.clone(),
                language: self.tmdb.language.clone(),
                api_token: self.tmdb.api_token.as_ref().map(|_| String::from(REDACTED)),
            },
            retry: self.retry.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Retry policy for the API client.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.initial_delay_ms),
        )
    }

    /// Catalog settings (base URL, language, TTLs).
    ///
    /// # Errors
    ///
    /// Returns an error if `tmdb.base_url` is not a valid URL.
    pub fn catalog_settings(&self) -> Result<CatalogSettings> {
        let settings = CatalogSettings::new(&self.tmdb.base_url)
            .with_context(|| format!("invalid tmdb.base_url: {}", self.tmdb.base_url))?
            .with_language(self.tmdb.language.clone())
            .with_genres_ttl(Duration::from_secs(self.cache.genres_ttl_secs))
            .with_top_rated_ttl(Duration::from_secs(self.cache.top_rated_ttl_secs));
        Ok(settings)
    }
}
