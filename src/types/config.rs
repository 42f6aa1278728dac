//! Configuration structures.
//!
//! Configuration is loaded from defaults and overridden from environment
//! variables; the binary layers CLI flags on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Kernel session and execution configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Code screening and authentication.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Per-caller request throttling.
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Background maintenance.
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

impl Config {
    /// Build a config from defaults plus environment overrides.
    ///
    /// Recognized variables: `WOLFRAM_KERNEL_PATH`, `WOLFRAM_LISTEN_ADDR`,
    /// `WOLFRAM_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("WOLFRAM_KERNEL_PATH") {
            if !path.is_empty() {
                config.engine.kernel_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(addr) = std::env::var("WOLFRAM_LISTEN_ADDR") {
            if !addr.is_empty() {
                config.server.listen_addr = addr;
            }
        }
        if let Ok(key) = std::env::var("WOLFRAM_API_KEY") {
            if !key.is_empty() {
                config.security.api_key = Some(key);
            }
        }
        config
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Kernel session and execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the kernel executable. When unset, `WOLFRAM_KERNEL_PATH` and
    /// then the `WolframKernel` on PATH are used.
    pub kernel_path: Option<PathBuf>,

    /// Maximum session creation attempts before reporting unavailable.
    pub max_retries: u32,

    /// Base delay of the exponential creation backoff (doubles per attempt).
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Per-request timeout when the caller omits one.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Hard cap on caller-requested timeouts.
    #[serde(with = "humantime_serde")]
    pub max_timeout: Duration,

    /// Inactivity threshold after which an idle session is eligible for
    /// teardown.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kernel_path: None,
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Code screening and authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// In strict mode any warning rejects the request; otherwise warnings are
    /// logged and returned alongside the result.
    pub strict: bool,

    /// Optional bearer token. When unset, requests pass unauthenticated.
    pub api_key: Option<String>,

    /// Maximum accepted source text size in bytes.
    pub max_code_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            strict: true,
            api_key: None,
            max_code_bytes: 50_000,
        }
    }
}

/// Per-caller request throttling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum requests per caller per minute.
    pub requests_per_minute: u32,

    /// Maximum requests per caller within the burst window (10 seconds).
    pub burst_size: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            burst_size: 5,
        }
    }
}

/// Background maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// How often the sweeper wakes up.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}
