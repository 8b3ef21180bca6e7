//! Configuration management for postrank using the prefer crate.
//!
//! A config file is discovered by `prefer` (or given explicitly) and parsed
//! with serde according to its extension. Every field has a default, so an
//! empty file, or no file at all, is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::display::ViewDisplay;
use crate::trending::{DEFAULT_CANDIDATE_POOL, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "postrank.db";

/// Default WordPress.com REST base.
pub const DEFAULT_STATS_BASE_URL: &str = "https://public-api.wordpress.com/rest/v1.1";

/// Errors loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// Stats provider connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// REST API base URL.
    pub base_url: String,
    /// Site identifier (domain or numeric blog ID).
    pub site: Option<String>,
    /// Bearer token. Prefer `POSTRANK_STATS_TOKEN` over writing it to a file.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts for transport failures.
    pub retries: u32,
    /// Base backoff delay in milliseconds.
    pub retry_base_ms: u64,
    /// Serve stats from a JSON fixture instead of the network.
    pub fixture: Option<PathBuf>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATS_BASE_URL.to_string(),
            site: None,
            token: None,
            timeout_secs: 5,
            retries: 1,
            retry_base_ms: 250,
            fixture: None,
        }
    }
}

impl StatsConfig {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(token) = env_non_empty("POSTRANK_STATS_TOKEN") {
            self.token = Some(token);
        }
        if let Some(site) = env_non_empty("POSTRANK_STATS_SITE") {
            self.site = Some(site);
        }
        self
    }
}

/// Trending cache and merge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    /// Trailing window in days (clamped to 1..=30 at use).
    pub window_days: u32,
    /// Upper bound on entries requested from the provider and kept per key.
    pub max_entries: usize,
    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Entity types included by default.
    pub entity_types: Vec<String>,
    /// Upper bound for candidate-set queries merged against the ranking.
    pub candidate_pool: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_entries: DEFAULT_MAX_ENTRIES,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            entity_types: vec!["post".to_string()],
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }
}

impl TrendingConfig {
    /// Cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename or URL (`sqlite:` prefix accepted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub display: ViewDisplay,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults (with env overrides) when nothing is found.
    pub async fn load() -> Self {
        match prefer::load("postrank").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        let mut config = Self::default();
        config.stats = config.stats.with_env_overrides();
        config
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        config.stats = config.stats.with_env_overrides();
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Directory relative paths are resolved against: the config file's
    /// directory if there is one, else the current directory.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a path that may be relative to the config file, expanding `~`.
    pub fn resolve_path(&self, path_str: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Data directory, defaulting to the platform data dir.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => self.resolve_path(dir),
            None => dirs::data_local_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("postrank"),
        }
    }

    /// SQLite database location. `DATABASE_URL` wins over the config file.
    pub fn database_path(&self) -> PathBuf {
        if let Some(url) = env_non_empty("DATABASE_URL") {
            return PathBuf::from(url.strip_prefix("sqlite:").unwrap_or(&url));
        }

        match &self.database {
            Some(db) => {
                let db = db.strip_prefix("sqlite:").unwrap_or(db);
                if db.contains('/') || db.contains('\\') {
                    self.resolve_path(db)
                } else {
                    self.data_dir().join(db)
                }
            }
            None => self.data_dir().join(DEFAULT_DATABASE_FILENAME),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::format::CountFormat;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("{}", "json").unwrap();
        assert_eq!(config.trending, TrendingConfig::default());
        assert_eq!(config.stats.timeout_secs, 5);
        assert_eq!(config.display.min, 20);
    }

    #[test]
    fn test_toml_config() {
        let config = Config::parse(
            r#"
            database = "views.db"

            [stats]
            site = "example.com"
            timeout_secs = 3

            [trending]
            window_days = 7
            entity_types = ["post", "page"]

            [display]
            min = 0
            format = "full"
            "#,
            "toml",
        )
        .unwrap();

        assert_eq!(config.stats.site.as_deref(), Some("example.com"));
        assert_eq!(config.stats.timeout_secs, 3);
        assert_eq!(config.stats.retries, 1);
        assert_eq!(config.trending.window_days, 7);
        assert_eq!(config.trending.max_entries, 100);
        assert_eq!(config.trending.entity_types, vec!["post", "page"]);
        assert_eq!(config.display.format, CountFormat::Full);
    }

    #[test]
    fn test_yaml_config() {
        let config = Config::parse("trending:\n  cache_ttl_secs: 60\n", "yaml").unwrap();
        assert_eq!(config.trending.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_trending_defaults_follow_cache_constants() {
        let trending = TrendingConfig::default();
        assert_eq!(trending.cache_ttl(), DEFAULT_TTL);
        assert_eq!(trending.max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(trending.candidate_pool, DEFAULT_CANDIDATE_POOL);
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Config::parse("[stats", "toml").unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_resolve_path_relative_to_config_file() {
        let config = Config {
            source_path: Some(PathBuf::from("/etc/postrank/postrank.toml")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_path("data"),
            PathBuf::from("/etc/postrank/data")
        );
        assert_eq!(config.resolve_path("/var/lib/x"), PathBuf::from("/var/lib/x"));
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postrank.json");
        std::fs::write(&path, r#"{"trending": {"candidate_pool": 50}}"#).unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.trending.candidate_pool, 50);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }
}
