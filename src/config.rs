use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SeekSenseError};

/// Main configuration structure for the SeekSense client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the review backend, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client
    pub timeout_seconds: u64,
}

/// Where the chat transcript lives between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    File,
    Redis,
    Memory,
}

impl SessionBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "file" => Some(Self::File),
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// Fixed key the transcript is stored under
    pub key: String,
    /// Directory for the file backend; defaults to the user data dir
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: u8,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
    pub create_timeout_seconds: u64,
    pub recycle_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("SEEKSENSE_CONFIG_PATH").unwrap_or_else(|_| "seeksense.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match Self::from_file(Path::new(&config_path)) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to load config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Config>(&contents)?)
    }

    fn apply_env_overrides(&mut self) {
        // API overrides
        if let Ok(url) = env::var("SEEKSENSE_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = env::var("SEEKSENSE_API_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.api.timeout_seconds = secs;
            }
        }

        // Session overrides
        if let Ok(backend) = env::var("SEEKSENSE_SESSION_BACKEND") {
            match SessionBackend::parse(&backend) {
                Some(b) => self.session.backend = b,
                None => tracing::warn!(
                    "Unknown SEEKSENSE_SESSION_BACKEND '{}', keeping {:?}",
                    backend,
                    self.session.backend
                ),
            }
        }
        if let Ok(key) = env::var("SEEKSENSE_SESSION_KEY") {
            self.session.key = key;
        }
        if let Ok(dir) = env::var("SEEKSENSE_SESSION_DIR") {
            self.session.dir = Some(PathBuf::from(dir));
        }

        // Redis overrides
        if let Ok(host) = env::var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Ok(port) = env::var("REDIS_PORT") {
            if let Ok(port_num) = port.parse() {
                self.redis.port = port_num;
            }
        }
        if let Ok(db) = env::var("REDIS_DB") {
            if let Ok(db_num) = db.parse() {
                self.redis.database = db_num;
            }
        }
        if let Ok(pool_size) = env::var("SEEKSENSE_REDIS_POOL_SIZE") {
            if let Ok(size) = pool_size.parse() {
                self.redis.pool.max_size = size;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(config_error("api.base_url cannot be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(config_error(format!(
                "api.base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.api.timeout_seconds == 0 {
            return Err(config_error("api.timeout_seconds cannot be 0"));
        }

        if self.session.key.trim().is_empty() {
            return Err(config_error("session.key cannot be empty"));
        }

        if self.session.backend == SessionBackend::Redis {
            if self.redis.port == 0 {
                return Err(config_error("Redis port cannot be 0"));
            }
            if self.redis.pool.max_size == 0 {
                return Err(config_error("Redis pool max_size cannot be 0"));
            }
        }

        Ok(())
    }

    /// Directory the file backend writes transcripts to
    pub fn session_dir(&self) -> PathBuf {
        self.session.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("seeksense"))
                .unwrap_or_else(|| PathBuf::from(".seeksense"))
        })
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    /// Get Redis URL with password from environment
    pub fn get_redis_url(&self) -> String {
        let password = env::var("REDIS_PASSWORD")
            .or_else(|_| env::var("REDIS_PASS"))
            .unwrap_or_default();

        if password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.database
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.database
            )
        }
    }

    pub fn get_pool_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.timeout_seconds)
    }

    pub fn get_pool_create_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.create_timeout_seconds)
    }

    pub fn get_pool_recycle_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.recycle_timeout_seconds)
    }
}

fn config_error(reason: impl Into<String>) -> SeekSenseError {
    SeekSenseError::Config(reason.into())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_seconds: 30,
            },
            session: SessionConfig {
                backend: SessionBackend::File,
                key: "chatMessages".to_string(),
                dir: None,
            },
            redis: RedisConfig {
                host: "localhost".to_string(),
                port: 6379,
                database: 0,
                pool: PoolConfig {
                    max_size: 4,
                    timeout_seconds: 5,
                    create_timeout_seconds: 5,
                    recycle_timeout_seconds: 5,
                },
            },
        }
    }
}
