//! Application state.

use std::sync::Arc;
use std::time::Duration;

use pixora_store::RocksStore;

use crate::config::ServiceConfig;
use crate::creem::CreemClient;
use crate::zhipu::ZhipuClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Upstream image-generation client (optional).
    pub generator: Option<Arc<ZhipuClient>>,

    /// Payment-provider client for checkout/portal (optional).
    pub payments: Option<Arc<CreemClient>>,
}

impl AppState {
    /// Create a new application state, building the integration clients
    /// that are configured.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let generator = config.zhipu_api_key.as_ref().map(|key| {
            tracing::info!(api_url = %config.zhipu_api_url, "Zhipu integration enabled");
            Arc::new(ZhipuClient::new(
                &config.zhipu_api_url,
                key,
                Duration::from_secs(config.zhipu_timeout_seconds),
            ))
        });

        if generator.is_none() {
            tracing::warn!("Zhipu not configured - image generation will be unavailable");
        }

        let payments = config.creem_api_key.as_ref().map(|key| {
            tracing::info!(api_url = %config.creem_api_url, "Creem integration enabled");
            Arc::new(CreemClient::new(&config.creem_api_url, key))
        });

        if payments.is_none() {
            tracing::warn!("Creem not configured - checkout and portal will be unavailable");
        }

        if config.creem_webhook_secret.is_none() {
            tracing::warn!("Creem webhook secret not configured - webhooks will be rejected");
        }

        Self {
            store,
            config,
            generator,
            payments,
        }
    }
}
