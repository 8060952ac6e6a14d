//! Persistence seam. The hosted backend owns the tables; this crate only
//! reads and writes rows through [`DataStore`].

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::{
    attempt::{AttemptPatch, AttemptRecord, NewAttempt},
    competition::CompetitionWindow,
    puzzle::Puzzle,
    user::{NewProfile, Profile},
};

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

pub type StoreResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Cheap reachability check for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;

    /// The active `competition_settings` row, if one exists.
    async fn active_competition_window(&self) -> StoreResult<Option<CompetitionWindow>>;

    /// Active puzzles ordered by id.
    async fn list_active_puzzles(&self) -> StoreResult<Vec<Puzzle>>;

    async fn get_puzzle(&self, puzzle_id: i64) -> StoreResult<Option<Puzzle>>;

    /// Every attempt of `user_id`, in no particular order.
    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<AttemptRecord>>;

    async fn find_attempt(
        &self,
        user_id: &str,
        puzzle_id: i64,
    ) -> StoreResult<Option<AttemptRecord>>;

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptRecord>;

    async fn update_attempt(
        &self,
        attempt_id: i64,
        patch: AttemptPatch,
    ) -> StoreResult<AttemptRecord>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile>;

    /// All profiles, newest first.
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
}
