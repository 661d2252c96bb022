use flighttrack_cache::{LocalCacheConfig, RedisCacheConfig};
use flighttrack_opensky::OpenSkyConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    /// OpenSky API and auth configuration
    #[serde(default)]
    pub opensky: OpenSkyConfig,
    /// SSE polling configuration
    #[serde(default)]
    pub stream: StreamConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.cache.local.max_size == 0 {
            return Err("cache.local.max_size must be > 0".into());
        }
        if self.cache.local.ttl_minutes == 0 {
            return Err("cache.local.ttl_minutes must be > 0".into());
        }
        if self.cache.redis.enabled {
            if self.cache.redis.url.trim().is_empty() {
                return Err("cache.redis.enabled=true requires cache.redis.url".into());
            }
            if self.cache.redis.pool_size == 0 {
                return Err("cache.redis.pool_size must be > 0".into());
            }
        }
        if self.stream.interval_seconds == 0 {
            return Err("stream.interval_seconds must be > 0".into());
        }
        self.opensky
            .validate()
            .map_err(|e| format!("opensky config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheSettings {
    #[serde(default)]
    pub local: LocalCacheSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

/// In-process tier sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheSettings {
    #[serde(default = "default_local_max_size")]
    pub max_size: usize,
    #[serde(default = "default_local_ttl_minutes")]
    pub ttl_minutes: u64,
}

fn default_local_max_size() -> usize {
    10_000
}
fn default_local_ttl_minutes() -> u64 {
    10
}

impl Default for LocalCacheSettings {
    fn default() -> Self {
        Self {
            max_size: default_local_max_size(),
            ttl_minutes: default_local_ttl_minutes(),
        }
    }
}

impl LocalCacheSettings {
    pub fn to_cache_config(&self) -> LocalCacheConfig {
        LocalCacheConfig {
            max_size: self.max_size,
            ttl: Duration::from_secs(self.ttl_minutes * 60),
        }
    }
}

/// Shared remote tier. Disabled by default; the service runs local-only
/// without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_redis_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_redis_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}
fn default_redis_pool_size() -> usize {
    16
}
fn default_redis_ttl_minutes() -> u64 {
    30
}
fn default_redis_timeout_seconds() -> u64 {
    2
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            ttl_minutes: default_redis_ttl_minutes(),
            timeout_seconds: default_redis_timeout_seconds(),
        }
    }
}

impl RedisSettings {
    pub fn to_cache_config(&self) -> RedisCacheConfig {
        RedisCacheConfig {
            ttl: Duration::from_secs(self.ttl_minutes * 60),
            op_timeout: Duration::from_secs(self.timeout_seconds),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds between upstream polls feeding the SSE broadcast.
    #[serde(default = "default_stream_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_stream_interval_seconds() -> u64 {
    5
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_stream_interval_seconds(),
        }
    }
}

impl StreamConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("flighttrack.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., FLIGHTTRACK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("FLIGHTTRACK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
