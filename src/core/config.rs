use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub delivery: DeliveryConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the latest slot. Created at startup.
    pub upload_dir: String,
    /// File name of the latest slot inside `upload_dir`.
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub max_upload_size_bytes: u64,
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_media_prefix")]
    pub accepted_media_prefix: String,
}

fn default_field_name() -> String {
    "video".to_string()
}
fn default_media_prefix() -> String {
    "video/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub cors_allowed_origins: Vec<String>,
    pub cache_control: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl AppConfig {
    /// Load configuration with layered overrides:
    /// 1. built-in defaults
    /// 2. config/default.toml (if present)
    /// 3. config/{env}.toml (based on VIDRELAY_ENV, if present)
    /// 4. Environment variables (PORT, VIDRELAY_* prefix)
    pub fn load() -> anyhow::Result<Self> {
        let mut config = AppConfig::default();

        let default_path = Path::new("config/default.toml");
        if let Some(file_config) = Self::read_file(default_path)? {
            config = file_config;
        }

        let env_name = std::env::var("VIDRELAY_ENV").unwrap_or_else(|_| "development".to_string());
        let env_path = format!("config/{}.toml", env_name);
        if let Some(env_config) = Self::read_file(Path::new(&env_path))? {
            config = env_config;
        }

        Self::apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<Option<AppConfig>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::anyhow!("failed to read {}: {}", path.display(), e));
            }
        };
        let config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?;
        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut AppConfig) {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok());
    }

    fn apply_overrides_from(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }
        if let Some(v) = lookup("VIDRELAY_SERVER_HOST") {
            config.server.host = v;
        }
        if let Some(v) = lookup("VIDRELAY_STORAGE_UPLOAD_DIR") {
            config.storage.upload_dir = v;
        }
        if let Some(v) = lookup("VIDRELAY_INGEST_MAX_UPLOAD_SIZE_BYTES") {
            if let Ok(max) = v.parse() {
                config.ingest.max_upload_size_bytes = max;
            }
        }
        if let Some(v) = lookup("VIDRELAY_OBSERVABILITY_LOG_LEVEL") {
            config.observability.log_level = v;
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ingest.max_upload_size_bytes == 0 {
            anyhow::bail!("ingest.max_upload_size_bytes must be greater than zero");
        }
        let name = &self.storage.file_name;
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            anyhow::bail!("storage.file_name must be a plain file name, got '{}'", name);
        }
        if self.ingest.accepted_media_prefix.is_empty() {
            anyhow::bail!("ingest.accepted_media_prefix must not be empty");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: StorageConfig {
                upload_dir: "uploads".to_string(),
                file_name: "latest.mp4".to_string(),
            },
            ingest: IngestConfig {
                max_upload_size_bytes: 104_857_600, // 100 MiB
                field_name: default_field_name(),
                accepted_media_prefix: default_media_prefix(),
            },
            delivery: DeliveryConfig {
                cors_allowed_origins: vec!["*".to_string()],
                cache_control: "no-cache".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
                metrics_enabled: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.upload_dir, "uploads");
        assert_eq!(config.storage.file_name, "latest.mp4");
        assert_eq!(config.ingest.max_upload_size_bytes, 100 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_override() {
        let vars: HashMap<&str, &str> = [("PORT", "8081")].into_iter().collect();
        let mut config = AppConfig::default();
        AppConfig::apply_overrides_from(&mut config, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_unparseable_port_is_ignored() {
        let vars: HashMap<&str, &str> = [("PORT", "not-a-port")].into_iter().collect();
        let mut config = AppConfig::default();
        AppConfig::apply_overrides_from(&mut config, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [storage]
            upload_dir = "/srv/uploads"
            file_name = "latest.mp4"

            [ingest]
            max_upload_size_bytes = 1024

            [delivery]
            cors_allowed_origins = ["*"]
            cache_control = "no-cache"

            [observability]
            log_level = "debug"
            log_format = "json"
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.ingest.field_name, "video");
        assert_eq!(config.ingest.accepted_media_prefix, "video/");
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.ingest.max_upload_size_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.file_name = "../escape.mp4".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ingest.accepted_media_prefix = String::new();
        assert!(config.validate().is_err());
    }
}
