use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub rate_limit: RateLimitConfig,

    pub logs: LogsConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Directory holding the browser front-end.
    pub static_dir: String,

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
            database_path: "sqlite:data/modhub.db".to_string(),
            log_level: "info".to_string(),
            static_dir: "public".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Use the first `X-Forwarded-For` entry as the client address.
    /// Disable when the service is exposed without a reverse proxy.
    pub trust_forwarded_headers: bool,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            trust_forwarded_headers: true,
            max_body_bytes: 10 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub user_token_ttl_hours: u32,

    pub admin_token_ttl_hours: u32,

    /// Username of the administrator created on first boot.
    pub initial_admin_username: String,

    /// Password for the first-boot administrator. A random one is generated
    /// and logged once when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_admin_password: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            user_token_ttl_hours: 7 * 24,
            admin_token_ttl_hours: 30 * 24,
            initial_admin_username: "admin".to_string(),
            initial_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Requests allowed per client IP inside one window.
    pub max_requests: u32,

    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Request paths starting with any of these prefixes are never audited.
    pub exclude_paths: Vec<String>,

    pub body_preview_chars: usize,

    pub body_max_chars: usize,

    pub error_max_chars: usize,

    /// Run `VACUUM` after a cleanup removed more rows than this.
    pub vacuum_threshold: u64,

    /// Daily retention pass keeping this many days of logs. Disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cleanup_days: Option<u32>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            exclude_paths: vec![
                "/api/logs".to_string(),
                "/logs.js".to_string(),
                "/admin_logs.js".to_string(),
                "/admin.js".to_string(),
                "/logs".to_string(),
            ],
            body_preview_chars: 500,
            body_max_chars: 5000,
            error_max_chars: 2000,
            vacuum_threshold: 1000,
            auto_cleanup_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub token_sweep_cron: String,

    pub log_cleanup_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_sweep_cron: "0 0 * * * *".to_string(),
            log_cleanup_cron: "0 30 3 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "modhub".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Applies `PORT`, `DB_PATH` and `ALLOWED_ORIGINS` on top of the file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }

        if let Some(path) = lookup("DB_PATH").filter(|v| !v.trim().is_empty()) {
            let path = path.trim();
            self.general.database_path = if path.starts_with("sqlite:") {
                path.to_string()
            } else {
                format!("sqlite:{path}")
            };
        }

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() {
                self.server.cors_allowed_origins = origins;
            }
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("modhub").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".modhub").join("config.toml"));
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
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.general.database_path.trim().is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.security.user_token_ttl_hours == 0 || self.security.admin_token_ttl_hours == 0 {
            anyhow::bail!("Token TTLs must be at least one hour");
        }

        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0)
        {
            anyhow::bail!("Rate limit window and max_requests must be > 0 when enabled");
        }

        if self.logs.body_preview_chars == 0
            || self.logs.body_max_chars == 0
            || self.logs.error_max_chars == 0
        {
            anyhow::bail!("Log preview sizes must be > 0");
        }

        if let Some(days) = self.logs.auto_cleanup_days
            && !(1..=365).contains(&days)
        {
            anyhow::bail!("logs.auto_cleanup_days must be between 1 and 365");
        }

        Ok(())
    }
}
