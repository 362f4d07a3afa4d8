use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{AppConfig, AppPaths};
use crate::history::ChatStore;
use crate::livedata::LiveDataClient;
use crate::llm::GatewayClient;

/// Shared application state. Built once at startup and cloned into handlers
/// behind an `Arc`.
pub struct AppState {
    pub paths: AppPaths,
    pub config: AppConfig,
    pub store: ChatStore,
    pub gateway: GatewayClient,
    pub live: LiveDataClient,
    /// Client for the upstream providers the aggregation endpoints call.
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = AppPaths::new();
        let config = AppConfig::load(&paths.config_path)?;

        let store = ChatStore::new(paths.db_path.clone())
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        let gateway = GatewayClient::new(&config.gateway);
        let live = LiveDataClient::new(&config.live_data);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.live_data.upstream_timeout_secs))
            .build()?;

        Ok(Arc::new(Self {
            paths,
            config,
            store,
            gateway,
            live,
            http,
        }))
    }
}
