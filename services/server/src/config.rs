//! Server configuration loading.
//!
//! TOML is the primary config source; environment variables override
//! individual fields on top of it. Default config path: `config/server.toml`,
//! overridable via the `CAMERA_WS_CONFIG` environment variable. A missing
//! file is not an error -- built-in defaults apply; a malformed file is.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub ws_path: String,
    pub rate_limit: RateLimitConfig,
    pub storage_thresholds: StorageThresholds,
    pub performance_thresholds: PerformanceThresholds,
    pub event_queue_capacity: usize,
    pub read_deadline: Duration,
    pub write_deadline: Duration,
    pub handler_deadline: Duration,
    pub heartbeat_interval: Duration,
    pub log_level: String,
    pub ping_requires_auth: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct StorageThresholds {
    pub warn_percent: f64,
    pub block_percent: f64,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct PerformanceThresholds {
    pub memory_percent: f64,
    pub error_rate_percent: f64,
    pub avg_response_ms: f64,
    pub max_connections: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            ws_path: "/ws".to_owned(),
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(1),
                max_requests: 20,
            },
            storage_thresholds: StorageThresholds {
                warn_percent: 80.0,
                block_percent: 95.0,
                poll_interval: Duration::from_secs(60),
            },
            performance_thresholds: PerformanceThresholds {
                memory_percent: 90.0,
                error_rate_percent: 5.0,
                avg_response_ms: 1000.0,
                max_connections: 900,
            },
            event_queue_capacity: 256,
            read_deadline: Duration::from_secs(90),
            write_deadline: Duration::from_secs(5),
            handler_deadline: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            log_level: "info".to_owned(),
            ping_requires_auth: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (every field optional; defaults fill gaps)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    bind_addr: Option<String>,
    ws_path: Option<String>,
    rate_limit: Option<RawRateLimit>,
    storage_thresholds: Option<RawStorageThresholds>,
    performance_thresholds: Option<RawPerformanceThresholds>,
    event_queue_capacity: Option<usize>,
    read_deadline_secs: Option<u64>,
    write_deadline_secs: Option<u64>,
    handler_deadline_secs: Option<u64>,
    heartbeat_interval_secs: Option<u64>,
    log_level: Option<String>,
    ping_requires_auth: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRateLimit {
    window_secs: Option<u64>,
    max_requests: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorageThresholds {
    warn_percent: Option<f64>,
    block_percent: Option<f64>,
    poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPerformanceThresholds {
    memory_percent: Option<f64>,
    error_rate_percent: Option<f64>,
    avg_response_ms: Option<f64>,
    max_connections: Option<u64>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Load config from the path named by `CAMERA_WS_CONFIG`, or the default
/// `config/server.toml` if unset. A missing file falls back to defaults;
/// environment variable overrides are always applied on top.
pub fn load() -> Result<ServerConfig, ConfigError> {
    let path = std::env::var("CAMERA_WS_CONFIG").unwrap_or_else(|_| "config/server.toml".to_owned());
    load_from_path(Path::new(&path))
}

pub fn load_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<RawConfig>(&contents)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    from_raw(raw)
}

fn from_raw(raw: RawConfig) -> Result<ServerConfig, ConfigError> {
    let defaults = ServerConfig::default();

    let rate_limit = match raw.rate_limit {
        Some(r) => RateLimitConfig {
            window: Duration::from_secs(r.window_secs.unwrap_or(defaults.rate_limit.window.as_secs())),
            max_requests: r.max_requests.unwrap_or(defaults.rate_limit.max_requests),
        },
        None => defaults.rate_limit,
    };

    let storage_thresholds = match raw.storage_thresholds {
        Some(s) => StorageThresholds {
            warn_percent: s.warn_percent.unwrap_or(defaults.storage_thresholds.warn_percent),
            block_percent: s.block_percent.unwrap_or(defaults.storage_thresholds.block_percent),
            poll_interval: Duration::from_secs(
                s.poll_interval_secs
                    .unwrap_or(defaults.storage_thresholds.poll_interval.as_secs()),
            ),
        },
        None => defaults.storage_thresholds,
    };
    if storage_thresholds.warn_percent > storage_thresholds.block_percent {
        return Err(ConfigError::InvalidValue(
            "storage_thresholds.warn_percent must be <= block_percent".to_owned(),
        ));
    }

    let performance_thresholds = match raw.performance_thresholds {
        Some(p) => PerformanceThresholds {
            memory_percent: p
                .memory_percent
                .unwrap_or(defaults.performance_thresholds.memory_percent),
            error_rate_percent: p
                .error_rate_percent
                .unwrap_or(defaults.performance_thresholds.error_rate_percent),
            avg_response_ms: p
                .avg_response_ms
                .unwrap_or(defaults.performance_thresholds.avg_response_ms),
            max_connections: p
                .max_connections
                .unwrap_or(defaults.performance_thresholds.max_connections),
        },
        None => defaults.performance_thresholds,
    };

    let mut config = ServerConfig {
        bind_addr: raw.bind_addr.unwrap_or(defaults.bind_addr),
        ws_path: raw.ws_path.unwrap_or(defaults.ws_path),
        rate_limit,
        storage_thresholds,
        performance_thresholds,
        event_queue_capacity: raw.event_queue_capacity.unwrap_or(defaults.event_queue_capacity),
        read_deadline: raw
            .read_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.read_deadline),
        write_deadline: raw
            .write_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.write_deadline),
        handler_deadline: raw
            .handler_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.handler_deadline),
        heartbeat_interval: raw
            .heartbeat_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_interval),
        log_level: raw.log_level.unwrap_or(defaults.log_level),
        ping_requires_auth: raw.ping_requires_auth.unwrap_or(defaults.ping_requires_auth),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Environment overrides layered on top of the TOML (or default) config,
/// following this codebase's `CAMERA_WS_*`-prefixed env-override convention.
fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(v) = std::env::var("CAMERA_WS_BIND_ADDR") {
        config.bind_addr = v;
    }
    if let Ok(v) = std::env::var("CAMERA_WS_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("CAMERA_WS_PING_REQUIRES_AUTH") {
        config.ping_requires_auth = matches!(v.as_str(), "1" | "true" | "yes");
    }
}
