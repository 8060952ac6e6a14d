use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::{DataStore, StoreResult};
use crate::error::BackendError;
use crate::models::{
    attempt::{AttemptPatch, AttemptRecord, Correctness, NewAttempt},
    competition::CompetitionWindow,
    puzzle::Puzzle,
    user::{NewProfile, Profile, UserRole},
};

#[derive(Default)]
struct Tables {
    window: Option<CompetitionWindow>,
    puzzles: BTreeMap<i64, Puzzle>,
    attempts: Vec<AttemptRecord>,
    profiles: Vec<Profile>,
    next_attempt_id: i64,
}

/// In-process store used for offline demos and tests.
///
/// Mirrors the constraints of the hosted schema that the rest of the crate
/// relies on: one attempt per (user, puzzle) and unique profile ids.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    attempts_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nine demo puzzles (tutorial, seven ring puzzles and the capstone) and
    /// a week-long window that opened an hour ago.
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let tables = Tables {
            window: Some(CompetitionWindow::new(
                now - Duration::hours(1),
                Some(now + Duration::days(7)),
            )),
            puzzles: demo_catalog()
                .into_iter()
                .map(|puzzle| (puzzle.id, puzzle))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
            attempts_unavailable: AtomicBool::new(false),
        }
    }

    pub async fn set_window(&self, window: Option<CompetitionWindow>) {
        self.tables.write().await.window = window;
    }

    /// Records a grading verdict, as the hosted backend's grader would.
    pub async fn set_correctness(
        &self,
        user_id: &str,
        puzzle_id: i64,
        correctness: Correctness,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.puzzle_id == puzzle_id)
            .ok_or_else(|| {
                BackendError::NotFound(format!(
                    "No attempt for user {} on puzzle {}",
                    user_id, puzzle_id
                ))
            })?;
        attempt.correctness = correctness;
        Ok(())
    }

    pub async fn set_role(&self, user_id: &str, role: UserRole) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .ok_or_else(|| BackendError::NotFound(format!("Profile {} not found", user_id)))?;
        profile.role = role;
        profile.updated_at = Utc::now();
        Ok(())
    }

    /// Makes every attempt read fail as if the backend were unreachable.
    pub fn set_attempts_unavailable(&self, unavailable: bool) {
        self.attempts_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    fn check_attempts_available(&self) -> StoreResult<()> {
        if self.attempts_unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::TransientNetwork(
                "attempts table unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn active_competition_window(&self) -> StoreResult<Option<CompetitionWindow>> {
        Ok(self.tables.read().await.window)
    }

    async fn list_active_puzzles(&self) -> StoreResult<Vec<Puzzle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .puzzles
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn get_puzzle(&self, puzzle_id: i64) -> StoreResult<Option<Puzzle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .puzzles
            .get(&puzzle_id)
            .filter(|p| p.is_active)
            .cloned())
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<AttemptRecord>> {
        self.check_attempts_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_attempt(
        &self,
        user_id: &str,
        puzzle_id: i64,
    ) -> StoreResult<Option<AttemptRecord>> {
        self.check_attempts_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .find(|a| a.user_id == user_id && a.puzzle_id == puzzle_id)
            .cloned())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptRecord> {
        let mut tables = self.tables.write().await;
        if tables
            .attempts
            .iter()
            .any(|a| a.user_id == attempt.user_id && a.puzzle_id == attempt.puzzle_id)
        {
            return Err(BackendError::Validation(
                "duplicate key value violates unique constraint on (user_id, puzzle_id)"
                    .to_string(),
            ));
        }

        tables.next_attempt_id += 1;
        let record = AttemptRecord {
            id: tables.next_attempt_id,
            user_id: attempt.user_id,
            puzzle_id: attempt.puzzle_id,
            answer: attempt.answer,
            correctness: attempt.correctness,
            submitted_at: attempt.submitted_at,
        };
        tables.attempts.push(record.clone());
        Ok(record)
    }

    async fn update_attempt(
        &self,
        attempt_id: i64,
        patch: AttemptPatch,
    ) -> StoreResult<AttemptRecord> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| BackendError::NotFound(format!("Attempt {} not found", attempt_id)))?;
        attempt.answer = patch.answer;
        attempt.correctness = patch.correctness;
        attempt.submitted_at = patch.submitted_at;
        Ok(attempt.clone())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables.profiles.iter().any(|p| p.id == profile.id) {
            return Err(BackendError::Validation(format!(
                "Profile {} already exists",
                profile.id
            )));
        }

        let now = Utc::now();
        let record = Profile {
            id: profile.id,
            email: profile.email,
            username: profile.username,
            full_name: profile.full_name,
            ip_address: profile.ip_address,
            role: UserRole::Participant,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.push(record.clone());
        Ok(record)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        let mut profiles = tables.profiles.clone();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }
}

fn demo_catalog() -> Vec<Puzzle> {
    let names = [
        "The Apprentice's Trial",
        "Whispering Glyphs",
        "The Clockwork Sigil",
        "Mirror of Ash",
        "Starlit Cipher",
        "The Drowned Library",
        "Ember and Bone",
        "The Hollow Crown",
        "The Arcane Heart",
    ];
    names
        .iter()
        .enumerate()
        .map(|(id, name)| Puzzle {
            id: id as i64,
            name: name.to_string(),
            description_html: format!("<p>{}</p>", name),
            image_url: None,
            modal_image_url: None,
            is_active: true,
        })
        .collect()
}
