use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub groq_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Groq,
    /// Offline echo backend, no credential needed
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    /// Override for the upstream base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Relay events buffered between the upstream task and the response body
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: postgen_llm::DEFAULT_MODEL.to_string(),
            base_url: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    32
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, `POSTGEN_` prefix and `__` between levels
    ///    (e.g. `POSTGEN_SERVER__PORT=8080`, `POSTGEN_LLM__PROVIDER=mock`)
    ///
    /// `GROQ_API_KEY` is read from the environment only and is required
    /// unless the mock provider is selected.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("POSTGEN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        cfg.groq_api_key = std::env::var("GROQ_API_KEY").unwrap_or_default();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.provider == Provider::Groq && self.groq_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "GROQ_API_KEY environment variable is required".to_string(),
            ));
        }
        if self.llm.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "llm.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [cors]
            enabled = true
            origins = ["http://localhost:5173"]

            [llm]
            provider = "mock"
            model = "llama-3.1-8b-instant"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.llm.provider, Provider::Mock);
        assert_eq!(config.llm.channel_capacity, 32);
        assert!(config.llm.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.addr(), "127.0.0.1:3000");
        assert_eq!(config.llm.model, postgen_llm::DEFAULT_MODEL);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_groq_requires_api_key() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.groq_api_key = "gsk_live".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let mut config = Config::default();
        config.llm.provider = Provider::Mock;
        config.llm.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
