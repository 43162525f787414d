use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, OccupancyService, SeaOrmAuthService, SeaOrmOccupancyService};

/// Everything a request handler or CLI command needs, built once at startup
/// and handed down explicitly.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub occupancy: Arc<dyn OccupancyService>,

    pub auth: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wires the services onto an already opened store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let occupancy = Arc::new(SeaOrmOccupancyService::new(store.clone()))
            as Arc<dyn OccupancyService + Send + Sync + 'static>;

        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        Self {
            config: Arc::new(config),
            store,
            occupancy,
            auth,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
