use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::error::{ApiError, BackendError};
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, SUBMISSIONS_REJECTED_TOTAL};
use crate::models::{
    attempt::{
        AttemptPatch, AttemptRecord, AttemptSummary, Correctness, NewAttempt, SubmitAnswerRequest,
        SubmitAnswerResponse,
    },
    user::UserRole,
};
use crate::services::{
    competition_clock::CompetitionClock,
    data_store::DataStore,
    puzzle_unlock::{self, CAPSTONE_PUZZLE_ID, TUTORIAL_PUZZLE_ID},
    session_gate, AppState,
};
use crate::utils::sanitize::sanitize_input;

pub struct SubmissionService {
    store: Arc<dyn DataStore>,
    clock: Arc<CompetitionClock>,
    tutorial_answer: String,
}

impl SubmissionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            clock: state.clock.clone(),
            tutorial_answer: state.config.competition.tutorial_answer.clone(),
        }
    }

    /// Records the caller's answer for `puzzle_id`, replacing any previous
    /// one. A closed window is reported in the response, not as an error,
    /// and leaves the store untouched.
    pub async fn submit(
        &self,
        user_id: &str,
        puzzle_id: i64,
        req: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, ApiError> {
        req.validate()?;
        let answer = sanitize_input(&req.answer);
        if answer.is_empty() {
            return Err(ApiError::bad_request("Answer must not be empty"));
        }

        let window = self.clock.window().await?;
        let role = self.role_of(user_id).await?;

        // Gate on the instant the request is handled
        if let Err(reason) = session_gate::admit(Utc::now(), &window, role) {
            SUBMISSIONS_REJECTED_TOTAL
                .with_label_values(&[reason.as_str()])
                .inc();
            tracing::info!(
                user_id,
                puzzle_id,
                reason = reason.as_str(),
                "Submission rejected outside the competition window"
            );
            return Ok(SubmitAnswerResponse {
                accepted: false,
                reason: Some(reason),
                attempt: None,
                status: None,
                message: reason.message().to_string(),
            });
        }

        self.ensure_visible(user_id, puzzle_id).await?;

        let correctness = self.grade(puzzle_id, &answer);
        let record = self.upsert(user_id, puzzle_id, answer, correctness).await?;

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[correctness.as_str()])
            .inc();
        tracing::info!(
            user_id,
            puzzle_id,
            correctness = correctness.as_str(),
            "Answer stored"
        );

        let message = match correctness {
            Correctness::Unknown => "Answer submitted",
            Correctness::Correct => "Correct! The tutorial is complete",
            Correctness::Incorrect => "That is not the answer. Try again",
        };

        Ok(SubmitAnswerResponse {
            accepted: true,
            reason: None,
            attempt: Some(AttemptSummary::from(&record)),
            status: Some(puzzle_unlock::status_for(Some(&record))),
            message: message.to_string(),
        })
    }

    async fn role_of(&self, user_id: &str) -> Result<UserRole, ApiError> {
        Ok(self
            .store
            .get_profile(user_id)
            .await?
            .map(|profile| profile.role)
            .unwrap_or_default())
    }

    async fn ensure_visible(&self, user_id: &str, puzzle_id: i64) -> Result<(), ApiError> {
        let not_found = || ApiError::not_found(format!("Puzzle {} not found", puzzle_id));

        if self.store.get_puzzle(puzzle_id).await?.is_none() {
            return Err(not_found());
        }

        let base_solved = if puzzle_id == CAPSTONE_PUZZLE_ID {
            let attempts = self.store.list_attempts(user_id).await?;
            puzzle_unlock::all_base_solved(&attempts)
        } else {
            false
        };

        if puzzle_unlock::is_visible(puzzle_id, base_solved) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    /// Only the tutorial is graded here; everything else waits for the
    /// external grader.
    fn grade(&self, puzzle_id: i64, answer: &str) -> Correctness {
        if puzzle_id != TUTORIAL_PUZZLE_ID {
            return Correctness::Unknown;
        }
        if answer
            .trim()
            .eq_ignore_ascii_case(self.tutorial_answer.trim())
        {
            Correctness::Correct
        } else {
            Correctness::Incorrect
        }
    }

    async fn upsert(
        &self,
        user_id: &str,
        puzzle_id: i64,
        answer: String,
        correctness: Correctness,
    ) -> Result<AttemptRecord, ApiError> {
        let patch = AttemptPatch {
            answer,
            correctness,
            submitted_at: Utc::now(),
        };

        if let Some(existing) = self.store.find_attempt(user_id, puzzle_id).await? {
            return Ok(self.store.update_attempt(existing.id, patch).await?);
        }

        let inserted = self
            .store
            .insert_attempt(NewAttempt {
                user_id: user_id.to_string(),
                puzzle_id,
                answer: patch.answer.clone(),
                correctness,
                submitted_at: patch.submitted_at,
            })
            .await;

        match inserted {
            Ok(record) => Ok(record),
            // A concurrent first submission won the insert; overwrite it.
            // Without a row to overwrite the rejection was not a conflict.
            Err(err @ BackendError::Validation(_)) => {
                match self.store.find_attempt(user_id, puzzle_id).await? {
                    Some(existing) => {
                        tracing::debug!(user_id, puzzle_id, "Insert conflict, updating instead");
                        Ok(self.store.update_attempt(existing.id, patch).await?)
                    }
                    None => {
                        tracing::warn!(user_id, puzzle_id, error = %err, "Attempt insert rejected");
                        Err(err.into())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
