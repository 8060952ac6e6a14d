use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::metrics::{record_window_cache_hit, record_window_cache_miss};
use crate::models::competition::CompetitionWindow;
use crate::services::data_store::{DataStore, StoreResult};

/// Process-wide cache of the active competition window.
///
/// The settings row changes rarely, so it is refetched at most once per TTL.
/// A zero TTL reads through on every call. Failed loads are never cached.
pub struct CompetitionClock {
    store: Arc<dyn DataStore>,
    ttl: Duration,
    cached: RwLock<Option<(Instant, CompetitionWindow)>>,
}

impl CompetitionClock {
    pub fn new(store: Arc<dyn DataStore>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_seconds),
            cached: RwLock::new(None),
        }
    }

    pub async fn window(&self) -> StoreResult<CompetitionWindow> {
        if !self.ttl.is_zero() {
            if let Some((loaded_at, window)) = *self.cached.read().await {
                if loaded_at.elapsed() < self.ttl {
                    record_window_cache_hit();
                    return Ok(window);
                }
            }
        }

        record_window_cache_miss();
        let window = self
            .store
            .active_competition_window()
            .await?
            .unwrap_or_else(CompetitionWindow::unconfigured);

        if !self.ttl.is_zero() {
            *self.cached.write().await = Some((Instant::now(), window));
        }
        tracing::debug!(
            start = ?window.start,
            end = ?window.end,
            "Loaded competition window"
        );
        Ok(window)
    }
}
