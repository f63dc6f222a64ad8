// Configuration module entry point
// Loads layered configuration and owns the per-process application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, GenerationConfig, HttpConfig, MarketConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Environment variable prefix, e.g. `GATEWAY_MARKET__CACHE_TTL_SECS=60`
const ENV_PREFIX: &str = "GATEWAY";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Missing files are allowed; defaults and environment fill the rest
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 90)?
            .set_default("performance.write_timeout", 90)?
            .set_default("http.server_name", "crypto-edu-gateway/0.1")?
            .set_default("http.enable_cors", true)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("market.base_url", "https://api.coingecko.com/api/v3")?
            .set_default("market.timeout_secs", 10)?
            .set_default("market.cache_ttl_secs", 300)?
            .set_default("generation.hub_url", "https://huggingface.co")?
            .set_default(
                "generation.inference_url",
                "https://api-inference.huggingface.co",
            )?
            .set_default("generation.timeout_secs", 60)?
            .set_default(
                "generation.image_model",
                "stabilityai/stable-diffusion-xl-base-1.0",
            )?
            .set_default(
                "generation.text_model",
                "mistralai/Mistral-7B-Instruct-v0.2",
            )?
            .set_default("generation.analysis_model", "ProsusAI/finbert")?
            .set_default("generation.search_limit", 10)?
            .set_default("generation.max_new_tokens", 512)?
            .set_default("generation.temperature", 0.7)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does/not/exist").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.routes.dominance_path, "/dominance");
        assert_eq!(cfg.routes.generation_path, "/generation");
        assert_eq!(cfg.market.cache_ttl_secs, 300);
        assert_eq!(cfg.generation.search_limit, 10);
        assert!(cfg.routes.health.enabled);
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load_from("does/not/exist").unwrap();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);

        let mut bad = cfg;
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }
}
