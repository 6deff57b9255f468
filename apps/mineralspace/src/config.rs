//! # Configuration
//!
//! MineralSpace reads an optional TOML file, then applies environment
//! overrides, then CLI flags (applied by the CLI layer).
//!
//! ```toml
//! database = "mineralspace.redb"
//! backend = "redb"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! rate_limit = 100
//! cors_origins = ["http://localhost:3000"]
//!
//! [wikidata]
//! api_url = "https://www.wikidata.org/w/api.php"
//! timeout_secs = 10
//! ```
//!
//! ## Environment Variables
//!
//! - `MINERALSPACE_API_KEY`: bearer token required on every endpoint but `/health`
//! - `MINERALSPACE_RATE_LIMIT`: requests per second (0 disables)
//! - `MINERALSPACE_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `MINERALSPACE_WIKIDATA_URL`: override the Wikidata endpoint

use mineralspace_core::MineralError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mineralspace.toml";

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database on disk.
    #[default]
    Redb,
    /// Volatile, for tests and demos.
    Memory,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub backend: Backend,
    pub server: ServerConfig,
    pub wikidata: WikidataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("mineralspace.redb"),
            backend: Backend::default(),
            server: ServerConfig::default(),
            wikidata: WikidataConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `None` means localhost only, `["*"]` means any.
    pub cors_origins: Option<Vec<String>>,
    /// Requests per second across all clients (0 disables limiting).
    pub rate_limit: u32,
    /// Bearer token; authentication is disabled when unset.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: None,
            rate_limit: 100,
            api_key: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Wikidata client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    pub api_url: String,
    /// Upper bound for one lookup, connect to last byte.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.wikidata.org/w/api.php".to_string(),
            timeout_secs: 10,
            user_agent: format!("mineralspace/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, MineralError> {
        toml::from_str(text).map_err(|e| MineralError::Config(e.to_string()))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `mineralspace.toml` in the
    /// working directory is used if present, defaults otherwise. Environment
    /// overrides are applied in both cases.
    pub fn load(path: Option<&Path>) -> Result<Self, MineralError> {
        let config = match path {
            Some(path) => Self::read_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::read_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    fn read_file(path: &Path) -> Result<Self, MineralError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MineralError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), MineralError> {
        if self.wikidata.timeout_secs == 0 {
            return Err(MineralError::Config(
                "wikidata.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.wikidata.api_url.is_empty() {
            return Err(MineralError::Config("wikidata.api_url is empty".to_string()));
        }
        Ok(())
    }

    /// Apply `MINERALSPACE_*` overrides from the given lookup.
    ///
    /// Invalid numeric values are ignored with a warning.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("MINERALSPACE_API_KEY").filter(|k| !k.is_empty()) {
            self.server.api_key = Some(key);
        }
        if let Some(raw) = lookup("MINERALSPACE_RATE_LIMIT") {
            match raw.parse() {
                Ok(rps) => self.server.rate_limit = rps,
                Err(_) => tracing::warn!("Ignoring invalid MINERALSPACE_RATE_LIMIT '{}'", raw),
            }
        }
        if let Some(raw) = lookup("MINERALSPACE_CORS_ORIGINS") {
            self.server.cors_origins = Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(url) = lookup("MINERALSPACE_WIKIDATA_URL").filter(|u| !u.is_empty()) {
            self.wikidata.api_url = url;
        }
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            backend = "memory"

            [server]
            port = 9090

            [wikidata]
            timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.wikidata.timeout_secs, 3);
        assert_eq!(config.wikidata.api_url, WikidataConfig::default().api_url);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            Config::from_toml_str(r#"backend = "sqlite""#),
            Err(MineralError::Config(_))
        ));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = Config::default();
        config.wikidata.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: BTreeMap<&str, &str> = [
            ("MINERALSPACE_API_KEY", "secret"),
            ("MINERALSPACE_RATE_LIMIT", "0"),
            ("MINERALSPACE_CORS_ORIGINS", "http://a.example, http://b.example"),
            ("MINERALSPACE_WIKIDATA_URL", "http://localhost:1234/api.php"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::default().with_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.rate_limit, 0);
        assert_eq!(
            config.server.cors_origins,
            Some(vec![
                "http://a.example".to_string(),
                "http://b.example".to_string()
            ])
        );
        assert_eq!(config.wikidata.api_url, "http://localhost:1234/api.php");
    }

    #[test]
    fn invalid_rate_limit_is_ignored() {
        let config = Config::default().with_env_overrides(|key| {
            (key == "MINERALSPACE_RATE_LIMIT").then(|| "lots".to_string())
        });
        assert_eq!(config.server.rate_limit, 100);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/mineralspace.toml"))).unwrap_err();
        assert!(matches!(err, MineralError::Config(_)));
    }
}
