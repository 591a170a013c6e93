use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utils::logging::LogFormat;

/// Env var naming an optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "CUSTOMERS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Process configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub log_format: LogFormat,
    pub log_level: String,
    /// Requests slower than this are logged at `warn`.
    pub slow_request_threshold_ms: u64,
    /// Upper bound for `pageSize` on list queries.
    pub max_page_size: u32,
    pub default_page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite://customers.db".to_string(),
            log_format: LogFormat::default(),
            log_level: "info".to_string(),
            slow_request_threshold_ms: 500,
            max_page_size: 100,
            default_page_size: 10,
        }
    }
}

impl AppConfig {
    /// Reads the file named by `CUSTOMERS_CONFIG` (if any) and applies
    /// environment overrides on top.
    pub async fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => load_config_from_file(&PathBuf::from(path)).await?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps an env var name to its value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some((key, port)) = lookup("BACKEND_PORT")
            .map(|v| ("BACKEND_PORT", v))
            .or_else(|| lookup("PORT").map(|v| ("PORT", v)))
        {
            self.port = parse_var(key, &port)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.log_format = format.parse().map_err(|e: strum::ParseError| {
                ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: format.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = level;
        }
        if let Some(threshold) = lookup("SLOW_REQUEST_THRESHOLD_MS") {
            self.slow_request_threshold_ms = parse_var("SLOW_REQUEST_THRESHOLD_MS", &threshold)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_page_size must be positive".into(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::ValidationError(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Missing file yields the defaults; a malformed file is an error.
pub async fn load_config_from_file(config_path: &Path) -> Result<AppConfig, ConfigError> {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Ok(serde_json::from_str(&raw_config)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %config_path.display(), "No config file found, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let config = AppConfig::default()
            .with_overrides(env(&[
                ("HOST", "127.0.0.1"),
                ("PORT", "9000"),
                ("BACKEND_PORT", " 8080 "),
                ("LOG_FORMAT", "JSON"),
                ("SLOW_REQUEST_THRESHOLD_MS", "50"),
            ]))
            .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.slow_request_threshold_ms, 50);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn rust_log_directive_reaches_the_log_filter_intact() {
        let config = AppConfig::default()
            .with_overrides(env(&[("RUST_LOG", "server=debug,sqlx=warn")]))
            .unwrap();

        assert_eq!(config.log_level, "server=debug,sqlx=warn");
        assert_eq!(
            utils::logging::filter_directives(&config.log_level),
            "server=debug,sqlx=warn"
        );
    }

    #[test]
    fn bad_port_is_reported_with_its_key() {
        let err = AppConfig::default()
            .with_overrides(env(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[tokio::test]
    async fn file_fills_missing_fields_with_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "port": 4100, "max_page_size": 50 }"#).unwrap();

        let config = load_config_from_file(file.path()).await.unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 10);

        let missing = load_config_from_file(Path::new("/nonexistent/customers.json"))
            .await
            .unwrap();
        assert_eq!(missing, AppConfig::default());
    }
}
