use chatstream::{ClientConfig, SessionConfig};
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ClientConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml (or `explicit`, when given)
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables: `CHATSTREAM_SERVER__BASE_URL`,
    ///    `CHATSTREAM_SESSION__DRAIN_INTERVAL_MS`, `CHATSTREAM_LOGGING__LEVEL`, ...
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let base = match explicit {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config/default").required(false),
        };

        let config = ConfigLoader::builder()
            .set_default("server.base_url", "http://localhost:3000")?
            .add_source(base)
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CHATSTREAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Secret comes from ENV only, never from TOML
        if let Ok(token) = std::env::var("CHATSTREAM_TOKEN") {
            if !token.is_empty() {
                cfg.server.bearer_token = Some(token);
            }
        }

        Ok(cfg)
    }
}
