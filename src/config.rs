use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub uploads: UploadConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret used to sign bearer tokens.
    /// Must be overridden in production (config file or `SECRET_KEY`).
    pub jwt_secret: String,

    /// Token signing algorithm. Only the HMAC family is accepted.
    pub jwt_algorithm: String,

    /// Lifetime of an issued access token.
    pub access_token_expire_minutes: u64,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "supersecretkey".to_string(),
            jwt_algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Root directory served under `/uploads`.
    pub upload_dir: String,

    /// Largest accepted avatar payload in bytes.
    pub max_avatar_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            max_avatar_bytes: 5 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    #[must_use]
    pub fn avatar_dir(&self) -> PathBuf {
        Path::new(&self.upload_dir).join("avatars")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:3002".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:3001".to_string(),
                "http://127.0.0.1:3002".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/roster.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

const HMAC_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Upper bound on `security.access_token_expire_minutes`: one year.
pub const MAX_TOKEN_LIFETIME_MINUTES: u64 = 365 * 24 * 60;

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over file values. The lookup is injected so
    /// tests don't have to touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.security.jwt_secret = secret;
        }
        if let Some(algorithm) = lookup("ALGORITHM") {
            self.security.jwt_algorithm = algorithm;
        }
        if let Some(minutes) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.security.access_token_expire_minutes = minutes
                .parse()
                .with_context(|| format!("Invalid ACCESS_TOKEN_EXPIRE_MINUTES: {minutes}"))?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("roster").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("security.jwt_secret cannot be empty");
        }

        if !HMAC_ALGORITHMS.contains(&self.security.jwt_algorithm.as_str()) {
            anyhow::bail!(
                "Unsupported token algorithm '{}', expected one of {:?}",
                self.security.jwt_algorithm,
                HMAC_ALGORITHMS
            );
        }

        if self.security.access_token_expire_minutes == 0 {
            anyhow::bail!("security.access_token_expire_minutes must be > 0");
        }

        if self.security.access_token_expire_minutes > MAX_TOKEN_LIFETIME_MINUTES {
            anyhow::bail!(
                "security.access_token_expire_minutes must be at most {MAX_TOKEN_LIFETIME_MINUTES} (one year)"
            );
        }

        if self.uploads.max_avatar_bytes == 0 {
            anyhow::bail!("uploads.max_avatar_bytes must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.access_token_expire_minutes, 30);
        assert_eq!(config.security.jwt_algorithm, "HS256");
        assert_eq!(config.uploads.max_avatar_bytes, 5 * 1024 * 1024);
        assert_eq!(config.uploads.avatar_dir(), PathBuf::from("uploads/avatars"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security]"));
        assert!(toml_str.contains("[uploads]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security]
            access_token_expire_minutes = 90
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.access_token_expire_minutes, 90);

        assert_eq!(config.security.jwt_algorithm, "HS256");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SECRET_KEY", "from-env"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.security.jwt_secret, "from-env");
        assert_eq!(config.security.access_token_expire_minutes, 5);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_env_override_rejects_bad_number() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "ACCESS_TOKEN_EXPIRE_MINUTES").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_token_lifetime() {
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| {
                (key == "ACCESS_TOKEN_EXPIRE_MINUTES").then(|| "1000000000000".to_string())
            })
            .unwrap();
        assert!(config.validate().is_err());

        config.security.access_token_expire_minutes = MAX_TOKEN_LIFETIME_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_asymmetric_algorithm() {
        let mut config = Config::default();
        config.security.jwt_algorithm = "RS256".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.jwt_secret.clear();
        assert!(config.validate().is_err());
    }
}
