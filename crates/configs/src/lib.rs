//! # configs
//!
//! Layered application configuration. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml`
//! 3. `config/local.toml` (not committed)
//! 4. `FORUM__SECTION__KEY` environment variables, after loading `.env`

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Longest trending window accepted, one leap year.
pub const MAX_TRENDING_WINDOW_HOURS: i64 = 24 * 366;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub forum: ForumConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or `memory://` for the volatile store.
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `forum_server=debug,sqlx=warn`.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    pub trending_limit: usize,
    pub trending_window_hours: i64,
    pub default_category_color: String,
}

impl AppConfig {
    /// Built-in defaults only; callers add their own sources on top.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "memory://")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_secret", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("forum.trending_limit", 3)?
            .set_default("forum.trending_window_hours", 24)?
            .set_default("forum.default_category_color", "#2196F3")?)
    }

    /// Loads every layer from the working directory and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("FORUM").separator("__").try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.forum.trending_limit == 0 || self.forum.trending_window_hours <= 0 {
            return Err(ConfigError::Invalid("forum trending limit and window must be positive".into()));
        }
        if self.forum.trending_window_hours > MAX_TRENDING_WINDOW_HOURS {
            return Err(ConfigError::Invalid(format!(
                "forum.trending_window_hours must be at most {MAX_TRENDING_WINDOW_HOURS}"
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn with_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        let builder = AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml));
        AppConfig::from_builder(builder)
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = with_toml("[auth]\njwt_secret = \"s3cret\"").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.database.is_memory());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.forum.trending_limit, 3);
        assert_eq!(config.forum.trending_window_hours, 24);
    }

    #[test]
    fn later_layers_override_defaults() {
        let config = with_toml(
            "[server]\nport = 8080\n[auth]\njwt_secret = \"x\"\n[logging]\nformat = \"json\"\n[forum]\ntrending_limit = 5",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.forum.trending_limit, 5);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = with_toml("").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("jwt_secret")));
    }

    #[test]
    fn trending_window_is_bounded() {
        let err = with_toml("[auth]\njwt_secret = \"x\"\n[forum]\ntrending_window_hours = 9223372036854775807")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("trending_window_hours")));

        let config = with_toml("[auth]\njwt_secret = \"x\"\n[forum]\ntrending_window_hours = 8784").unwrap();
        assert_eq!(config.forum.trending_window_hours, MAX_TRENDING_WINDOW_HOURS);
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let config = with_toml("[auth]\njwt_secret = \"hunter2\"").unwrap();
        assert!(!format!("{:?}", config.auth).contains("hunter2"));
    }
}
