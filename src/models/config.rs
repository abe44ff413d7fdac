//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote catalog and per-call HTTP behavior
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Record cache bounds
    #[serde(default)]
    pub cache: CacheConfig,

    /// Cache completeness heuristic
    #[serde(default)]
    pub staleness: StalenessConfig,

    /// Reference expansion settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Inbound query settings
    #[serde(default)]
    pub request: RequestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.user_agent.trim().is_empty() {
            return Err(AppError::validation("upstream.user_agent is empty"));
        }
        let base = Url::parse(&self.upstream.base_url)
            .map_err(|e| AppError::validation(format!("upstream.base_url: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(
                "upstream.base_url must be an http(s) URL",
            ));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(AppError::validation("upstream.timeout_ms must be > 0"));
        }
        if self.upstream.search_timeout_ms == 0 {
            return Err(AppError::validation(
                "upstream.search_timeout_ms must be > 0",
            ));
        }
        if self.upstream.max_pages == 0 {
            return Err(AppError::validation("upstream.max_pages must be > 0"));
        }
        if self.cache.max_entries == 0 {
            return Err(AppError::validation("cache.max_entries must be > 0"));
        }
        if self.cache.idle_secs == 0 {
            return Err(AppError::validation("cache.idle_secs must be > 0"));
        }
        if self.cache.queue_depth == 0 {
            return Err(AppError::validation("cache.queue_depth must be > 0"));
        }
        if self.resolver.max_depth == 0 {
            return Err(AppError::validation("resolver.max_depth must be > 0"));
        }
        if self.resolver.max_concurrent == 0 {
            return Err(AppError::validation("resolver.max_concurrent must be > 0"));
        }
        if self.request.timeout_ms == 0 {
            return Err(AppError::validation("request.timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// Remote catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Root of the remote API; resource paths are joined onto it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-call timeout for page and record requests
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Per-call timeout for search requests
    #[serde(default = "defaults::search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Upper bound on pages followed in one crawl
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_ms: defaults::timeout_ms(),
            search_timeout_ms: defaults::search_timeout_ms(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// Record cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of distinct records held
    #[serde(default = "defaults::max_entries")]
    pub max_entries: usize,

    /// Records unread for longer than this are dropped
    #[serde(default = "defaults::idle_secs")]
    pub idle_secs: u64,

    /// Capacity of the cache worker's command queue
    #[serde(default = "defaults::queue_depth")]
    pub queue_depth: usize,
}

impl CacheConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: defaults::max_entries(),
            idle_secs: defaults::idle_secs(),
            queue_depth: defaults::queue_depth(),
        }
    }
}

/// Staleness heuristic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    /// Slack subtracted from the upstream count before comparing
    #[serde(default = "defaults::margin")]
    pub margin: usize,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            margin: defaults::margin(),
        }
    }
}

/// Reference expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Levels of references expanded per call (1 = direct references only)
    #[serde(default = "defaults::max_depth")]
    pub max_depth: usize,

    /// In-flight lookups per reference field
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Record fields holding lists of record URLs
    #[serde(default = "defaults::reference_fields")]
    pub reference_fields: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: defaults::max_depth(),
            max_concurrent: defaults::max_concurrent(),
            reference_fields: defaults::reference_fields(),
        }
    }
}

/// Inbound query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Deadline for one whole query, including crawl and resolution
    #[serde(default = "defaults::request_timeout_ms")]
    pub timeout_ms: u64,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "https://swapi.dev/api/".into()
    }
    pub fn user_agent() -> String {
        concat!("catalog-proxy/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout_ms() -> u64 {
        2500
    }
    pub fn search_timeout_ms() -> u64 {
        1000
    }
    pub fn max_pages() -> usize {
        500
    }
    pub fn max_entries() -> usize {
        1000
    }
    pub fn idle_secs() -> u64 {
        600
    }
    pub fn queue_depth() -> usize {
        256
    }
    pub fn margin() -> usize {
        8
    }
    pub fn max_depth() -> usize {
        1
    }
    pub fn max_concurrent() -> usize {
        8
    }
    pub fn reference_fields() -> Vec<String> {
        [
            "characters",
            "films",
            "people",
            "pilots",
            "planets",
            "residents",
            "species",
            "starships",
            "vehicles",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn request_timeout_ms() -> u64 {
        3000
    }
}
