//! Service configuration.

use pixora_core::PricingConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/pixora").
    pub data_dir: String,

    /// HS256 secret for bearer-token validation.
    pub jwt_secret: String,

    /// Expected JWT audience (default: "pixora").
    pub jwt_audience: String,

    /// Zhipu API base URL.
    pub zhipu_api_url: String,

    /// Zhipu API key (optional; generation is disabled without it).
    pub zhipu_api_key: Option<String>,

    /// Timeout for upstream generation and enhancement calls, in seconds.
    pub zhipu_timeout_seconds: u64,

    /// Creem API base URL.
    pub creem_api_url: String,

    /// Creem API key (optional; checkout/portal are disabled without it).
    pub creem_api_key: Option<String>,

    /// Creem webhook signing secret (optional; webhooks are rejected
    /// without it).
    pub creem_webhook_secret: Option<String>,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds. Must exceed the upstream timeout so the
    /// gateway, not the HTTP layer, decides the outcome of a slow call.
    pub request_timeout_seconds: u64,

    /// Pricing configuration.
    pub pricing: PricingConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set - using development secret");
            "pixora-dev-secret".into()
        });

        let credits_per_generation = std::env::var("CREDITS_PER_GENERATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(pixora_core::DEFAULT_CREDITS_PER_GENERATION);

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/pixora".into()),
            jwt_secret,
            jwt_audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pixora".into()),
            zhipu_api_url: std::env::var("ZHIPU_API_URL")
                .unwrap_or_else(|_| "https://open.bigmodel.cn/api/paas/v4".into()),
            zhipu_api_key: std::env::var("ZHIPU_API_KEY").ok(),
            zhipu_timeout_seconds: std::env::var("ZHIPU_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            creem_api_url: std::env::var("CREEM_API_URL")
                .unwrap_or_else(|_| "https://api.creem.io".into()),
            creem_api_key: std::env::var("CREEM_API_KEY").ok(),
            creem_webhook_secret: std::env::var("CREEM_WEBHOOK_SECRET").ok(),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(90),
            pricing: PricingConfig {
                credits_per_generation,
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/pixora".into(),
            jwt_secret: "pixora-dev-secret".into(),
            jwt_audience: "pixora".into(),
            zhipu_api_url: "https://open.bigmodel.cn/api/paas/v4".into(),
            zhipu_api_key: None,
            zhipu_timeout_seconds: 60,
            creem_api_url: "https://api.creem.io".into(),
            creem_api_key: None,
            creem_webhook_secret: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 90,
            pricing: PricingConfig::default(),
        }
    }
}
