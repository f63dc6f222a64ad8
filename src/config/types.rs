// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    pub market: MarketConfig,
    pub generation: GenerationConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Routes configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RoutesConfig {
    /// Market snapshot endpoint (default: /dominance)
    #[serde(default = "default_dominance_path")]
    pub dominance_path: String,
    /// Action dispatch endpoint (default: /generation)
    #[serde(default = "default_generation_path")]
    pub generation_path: String,
    /// Health check configuration
    #[serde(default)]
    pub health: HealthConfig,
}

#[allow(clippy::missing_const_for_fn)]
fn default_dominance_path() -> String {
    "/dominance".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_generation_path() -> String {
    "/generation".to_string()
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            dominance_path: default_dominance_path(),
            generation_path: default_generation_path(),
            health: HealthConfig::default(),
        }
    }
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

/// Upstream market data configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    /// Base URL of the aggregate market API (CoinGecko v3 compatible)
    pub base_url: String,
    /// Optional API key, sent as `x-cg-demo-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
    /// Snapshot freshness window in seconds, 0 disables caching
    pub cache_ttl_secs: u64,
}

/// Upstream generation service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Model hub base URL, used for model search
    pub hub_url: String,
    /// Inference API base URL, used for every model call
    pub inference_url: String,
    /// Optional bearer token for both endpoints
    #[serde(default)]
    pub api_token: Option<String>,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
    pub image_model: String,
    pub text_model: String,
    pub analysis_model: String,
    /// Default result count for model search
    pub search_limit: usize,
    pub max_new_tokens: u32,
    pub temperature: f32,
}
