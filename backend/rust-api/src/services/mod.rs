use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::middlewares::auth::JwtService;

use self::competition_clock::CompetitionClock;
use self::data_store::{DataStore, MemoryStore, SupabaseStore};
use self::identity::{IdentityProvider, MemoryIdentity, SupabaseIdentity};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DataStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<CompetitionClock>,
    pub jwt: JwtService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let state = match config.store_backend {
            StoreBackend::Supabase => {
                tracing::info!("Using Supabase backend at {}", config.supabase.url);
                let store = Arc::new(SupabaseStore::new(&config.supabase)?);
                let identity = Arc::new(SupabaseIdentity::new(&config.supabase)?);
                Self::with_backends(config, store, identity)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store with demo data; nothing is persisted");
                let identity = Arc::new(MemoryIdentity::new(&config.jwt_secret));
                Self::with_backends(config, Arc::new(MemoryStore::with_demo_data()), identity)
            }
        };

        // Reachability only; the API still starts when the backend is down
        match tokio::time::timeout(std::time::Duration::from_secs(5), state.store.ping()).await {
            Ok(Ok(())) => tracing::info!("Data store reachable"),
            Ok(Err(e)) => tracing::warn!("Data store ping failed: {}", e),
            Err(_) => tracing::warn!("Data store ping timed out after 5s"),
        }

        Ok(state)
    }

    pub fn with_backends(
        config: Config,
        store: Arc<dyn DataStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let clock = Arc::new(CompetitionClock::new(
            store.clone(),
            config.competition.window_cache_seconds,
        ));
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            config,
            store,
            identity,
            clock,
            jwt,
        }
    }
}

pub mod competition_clock;
pub mod dashboard_service;
pub mod data_store;
pub mod identity;
pub mod puzzle_unlock;
pub mod session_gate;
pub mod submission_service;
pub mod time_window;
