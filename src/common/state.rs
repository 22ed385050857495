use std::sync::Arc;

use crate::config::Config;
use crate::frost::FrostClient;
use crate::services::cache::{SeriesCache, build_cache};
use crate::session::{SessionStore, ThingRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub frost_client: Arc<FrostClient>,
    pub series_cache: SeriesCache,
    pub registry: Arc<ThingRegistry>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, frost_client: FrostClient) -> Self {
        let series_cache = build_cache(config.cache_max_bytes, config.cache_ttl_seconds);
        let sessions = SessionStore::new(config.session_max, config.session_idle_seconds);

        Self {
            config: Arc::new(config),
            frost_client: Arc::new(frost_client),
            series_cache,
            registry: Arc::new(ThingRegistry::new()),
            sessions,
        }
    }
}
