use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::PublishError;
use crate::ratelimit::Rate;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    /// Seconds a request may take before it is answered with 408.
    pub request_timeout: u64,
    /// Global `Cache-Control` switch. Unset means enabled.
    pub cache_control: Option<bool>,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base of the URLs handed back to clients; the request `Host` otherwise.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory://`, `file:///path` or `s3://bucket`.
    pub content_url: String,
    /// Where post metadata lives. Defaults to `content_url`.
    pub metadata_url: Option<String>,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub read: String,
    pub publish: String,
    pub health: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            request_timeout: 5,
            cache_control: None,
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_url: "memory://".to_string(),
            metadata_url: None,
            static_dir: "./static".into(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            read: "10/minute".to_string(),
            publish: "60/hour".to_string(),
            health: "20/minute".to_string(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, PublishError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PublishError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, value
        ))),
    }
}

impl Config {
    /// Reads `path` (the CLI flag or `CONFIG_PATH`), then applies the
    /// environment overrides.
    pub fn load_from(path: Option<&str>) -> Result<Self, PublishError> {
        let mut config = match path {
            // 首先尝试从指定的文件加载
            Some(path) => Self::from_file(path)?,
            // 否则使用默认配置
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, PublishError> {
        info!("Loading configuration from {}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| PublishError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PublishError> {
        toml::from_str(content).map_err(|e| PublishError::Config(e.to_string()))
    }

    /// Applies the `EASYPUB_*` overrides returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), PublishError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EASYPUB_DEBUG") {
            self.debug = parse_bool("EASYPUB_DEBUG", &value)?;
        }
        if let Some(value) = lookup("EASYPUB_REQUEST_TIMEOUT") {
            self.request_timeout = value.trim().parse().map_err(|_| {
                PublishError::Config(format!(
                    "EASYPUB_REQUEST_TIMEOUT must be a number of seconds, got {:?}",
                    value
                ))
            })?;
        }
        if let Some(value) = lookup("EASYPUB_CACHE_CONTROL") {
            self.cache_control = Some(parse_bool("EASYPUB_CACHE_CONTROL", &value)?);
        }
        if let Some(value) = lookup("EASYPUB_CONTENT_URL") {
            self.storage.content_url = value;
        }
        if let Some(value) = lookup("EASYPUB_METADATA_URL") {
            self.storage.metadata_url = Some(value).filter(|v| !v.is_empty());
        }
        if let Some(value) = lookup("EASYPUB_PUBLIC_URL") {
            self.server.public_url = Some(value).filter(|v| !v.is_empty());
        }
        debug!("Configuration after environment overrides: {:?}", self);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PublishError> {
        if self.request_timeout == 0 {
            return Err(PublishError::Config(
                "request_timeout must be at least one second".into(),
            ));
        }
        self.public_url()?;
        self.read_rate()?;
        self.publish_rate()?;
        self.health_rate()?;
        Ok(())
    }

    pub fn metadata_url(&self) -> &str {
        self.storage
            .metadata_url
            .as_deref()
            .unwrap_or(&self.storage.content_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn public_url(&self) -> Result<Option<Url>, PublishError> {
        self.server
            .public_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| PublishError::Config(format!("invalid public_url {:?}: {}", raw, e)))
            })
            .transpose()
    }

    pub fn read_rate(&self) -> Result<Rate, PublishError> {
        Rate::parse(&self.limits.read)
    }

    pub fn publish_rate(&self) -> Result<Rate, PublishError> {
        Rate::parse(&self.limits.publish)
    }

    pub fn health_rate(&self) -> Result<Rate, PublishError> {
        Rate::parse(&self.limits.health)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_control, None);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
debug = true
cache_control = false

[server]
port = 9000
public_url = "https://pub.example.org"

[storage]
content_url = "file:///tmp/easypub"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(config.debug);
        assert_eq!(config.cache_control, Some(false));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.content_url, "file:///tmp/easypub");
        assert_eq!(config.limits.read, "10/minute");
        assert_eq!(
            config.public_url().unwrap().unwrap().as_str(),
            "https://pub.example.org/"
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("EASYPUB_DEBUG", "yes"),
            ("EASYPUB_REQUEST_TIMEOUT", "12"),
            ("EASYPUB_CACHE_CONTROL", "0"),
            ("EASYPUB_CONTENT_URL", "s3://posts"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(config.debug);
        assert_eq!(config.request_timeout, 12);
        assert_eq!(config.cache_control, Some(false));
        assert_eq!(config.storage.content_url, "s3://posts");
        assert_eq!(config.metadata_url(), "s3://posts");
        assert_eq!(config.server.public_url, None);

        config
            .apply_env(|key| (key == "EASYPUB_METADATA_URL").then(|| "memory://".to_string()))
            .unwrap();
        assert_eq!(config.metadata_url(), "memory://");
    }

    #[test]
    fn test_bad_env_override() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "EASYPUB_DEBUG").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, PublishError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.request_timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.limits.read = "ten per minute".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.public_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}
