//! Service configuration.

use std::path::PathBuf;

use storage::ObjectStorageConfig;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Settings of the HTTP service itself. Pipeline settings live in
/// `elevation_pipeline::PipelineConfig`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen address
    pub listen: String,

    /// Origins allowed by CORS. Empty or `*` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Optional YAML file with pipeline settings.
    pub pipeline_config: Option<PathBuf>,

    pub storage: ObjectStorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            allowed_origins: Vec::new(),
            pipeline_config: None,
            storage: ObjectStorageConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            storage: ObjectStorageConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("API_LISTEN_ADDR") {
            config.listen = val;
        }

        if let Ok(val) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&val);
        }

        if let Ok(val) = std::env::var("PIPELINE_CONFIG") {
            if !val.trim().is_empty() {
                config.pipeline_config = Some(PathBuf::from(val));
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("invalid listen address: {}", self.listen));
        }
        for origin in &self.allowed_origins {
            if origin != "*" && origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(format!("invalid CORS origin: {}", origin));
            }
        }
        self.storage.validate()
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// CORS policy for the configured origins.
    pub fn cors_layer(&self) -> CorsLayer {
        if self.allows_any_origin() {
            return CorsLayer::permissive();
        }

        let origins: Vec<axum::http::HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Split a comma separated origin list.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
