//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::DEFAULT_ACTOR;
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub default_actor: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: String,
    pub request_timeout_seconds: u64,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    /// Daily rolling log files are written here when set.
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::builder(&env)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn builder(env: &str) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", env)?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "estate-server")?
            .set_default("app.default_actor", DEFAULT_ACTOR)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_seconds", 3)?
            .set_default("database.run_migrations", true)?
            .set_default("server.cors_allowed_origins", Vec::<String>::new())?
            .set_default("server.static_dir", "static")?
            .set_default("server.request_timeout_seconds", 30)?
            .set_default("server.body_limit_bytes", 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_everything_but_database_url() {
        let config: AppConfig = AppConfig::builder("test")
            .unwrap()
            .set_override("database.url", "postgres://localhost/estate")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.app.default_actor, "system");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert!(config.server.cors_allowed_origins.is_empty());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.directory.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let result: Result<AppConfig, _> = AppConfig::builder("test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize();
        assert!(result.is_err());
    }
}
