use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::models::{
    attempt::{AttemptRecord, AttemptSummary},
    competition::{CompetitionResponse, CompetitionWindow},
    puzzle::{DashboardResponse, PuzzleDetailResponse},
};
use crate::services::{
    competition_clock::CompetitionClock,
    data_store::DataStore,
    puzzle_unlock, session_gate,
    time_window::classify_window,
    AppState,
};

pub fn competition_snapshot(now: DateTime<Utc>, window: &CompetitionWindow) -> CompetitionResponse {
    let state = classify_window(now, window);
    CompetitionResponse {
        start: window.start,
        end: window.end,
        phase: state.phase,
        remaining: state.remaining,
        server_time: now,
    }
}

pub struct DashboardService {
    store: Arc<dyn DataStore>,
    clock: Arc<CompetitionClock>,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            clock: state.clock.clone(),
        }
    }

    pub async fn competition(&self) -> Result<CompetitionResponse, ApiError> {
        let window = self.clock.window().await?;
        Ok(competition_snapshot(Utc::now(), &window))
    }

    pub async fn dashboard(&self, user_id: &str) -> Result<DashboardResponse, ApiError> {
        let window = self.clock.window().await?;
        let catalog = self.store.list_active_puzzles().await?;
        let role = self
            .store
            .get_profile(user_id)
            .await?
            .map(|profile| profile.role)
            .unwrap_or_default();

        // Render fully locked rather than failing the whole page
        let (attempts, attempts_degraded) = match self.store.list_attempts(user_id).await {
            Ok(attempts) => (attempts, false),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Attempts unavailable, rendering locked dashboard");
                (Vec::new(), true)
            }
        };

        let now = Utc::now();
        Ok(DashboardResponse {
            competition: competition_snapshot(now, &window),
            can_submit: session_gate::can_submit(now, &window, role),
            all_base_solved: puzzle_unlock::all_base_solved(&attempts),
            attempts_degraded,
            puzzles: puzzle_unlock::resolve(&catalog, &attempts),
        })
    }

    pub async fn puzzle_detail(
        &self,
        user_id: &str,
        puzzle_id: i64,
    ) -> Result<PuzzleDetailResponse, ApiError> {
        let not_found = || ApiError::not_found(format!("Puzzle {} not found", puzzle_id));

        let puzzle = self.store.get_puzzle(puzzle_id).await?.ok_or_else(not_found)?;
        let attempts = self.store.list_attempts(user_id).await?;

        if !puzzle_unlock::is_visible(puzzle_id, puzzle_unlock::all_base_solved(&attempts)) {
            return Err(not_found());
        }

        let previous = latest_attempt(&attempts, puzzle_id);
        Ok(PuzzleDetailResponse {
            puzzle,
            status: puzzle_unlock::status_for(previous),
            previous_attempt: previous.map(AttemptSummary::from),
        })
    }
}

fn latest_attempt(attempts: &[AttemptRecord], puzzle_id: i64) -> Option<&AttemptRecord> {
    attempts
        .iter()
        .filter(|attempt| attempt.puzzle_id == puzzle_id)
        .max_by_key(|attempt| attempt.submitted_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{
        attempt::{Correctness, NewAttempt},
        competition::Phase,
        puzzle::PuzzleStatus,
    };
    use crate::services::data_store::MemoryStore;
    use crate::services::identity::MemoryIdentity;

    fn service(store: Arc<MemoryStore>) -> DashboardService {
        let state = AppState::with_backends(
            Config::in_memory("secret"),
            store,
            Arc::new(MemoryIdentity::new("secret")),
        );
        DashboardService::new(&state)
    }

    async fn record(store: &MemoryStore, puzzle_id: i64, correctness: Correctness) {
        store
            .insert_attempt(NewAttempt {
                user_id: "u1".to_string(),
                puzzle_id,
                answer: "guess".to_string(),
                correctness,
                submitted_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn degraded_attempts_render_locked() {
        let store = Arc::new(MemoryStore::with_demo_data());
        record(&store, 1, Correctness::Correct).await;
        store.set_attempts_unavailable(true);

        let dashboard = service(store).dashboard("u1").await.unwrap();
        assert!(dashboard.attempts_degraded);
        assert!(!dashboard.all_base_solved);
        assert_eq!(dashboard.puzzles.len(), 8);
        assert!(dashboard
            .puzzles
            .iter()
            .all(|p| p.status == PuzzleStatus::Locked));
    }

    #[tokio::test]
    async fn demo_window_is_active_and_open() {
        let store = Arc::new(MemoryStore::with_demo_data());
        let dashboard = service(store).dashboard("u1").await.unwrap();
        assert_eq!(dashboard.competition.phase, Phase::Active);
        assert!(dashboard.can_submit);
        assert!(!dashboard.attempts_degraded);
    }

    #[tokio::test]
    async fn detail_includes_previous_attempt() {
        let store = Arc::new(MemoryStore::with_demo_data());
        record(&store, 4, Correctness::Incorrect).await;

        let detail = service(store).puzzle_detail("u1", 4).await.unwrap();
        assert_eq!(detail.status, PuzzleStatus::Incorrect);
        assert_eq!(detail.previous_attempt.unwrap().answer, "guess");
    }

    #[tokio::test]
    async fn capstone_detail_requires_completion() {
        let store = Arc::new(MemoryStore::with_demo_data());
        let svc = service(store.clone());
        assert!(matches!(
            svc.puzzle_detail("u1", 8).await,
            Err(ApiError::NotFound(_))
        ));

        for id in 1..=7 {
            record(&store, id, Correctness::Correct).await;
        }
        let detail = svc.puzzle_detail("u1", 8).await.unwrap();
        assert_eq!(detail.status, PuzzleStatus::Locked);
        assert!(detail.previous_attempt.is_none());
    }

    #[test]
    fn snapshot_of_unconfigured_window() {
        let snapshot = competition_snapshot(Utc::now(), &CompetitionWindow::unconfigured());
        assert_eq!(snapshot.phase, Phase::NotConfigured);
        assert!(snapshot.remaining.is_none());
    }
}
