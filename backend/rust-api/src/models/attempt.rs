use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{competition::SubmissionRejection, puzzle::PuzzleStatus};

/// Grading state of an attempt.
///
/// Stored as a nullable boolean (`is_correct`); `null` means grading is
/// still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Correctness {
    #[default]
    Unknown,
    Correct,
    Incorrect,
}

impl From<Option<bool>> for Correctness {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Correctness::Unknown,
            Some(true) => Correctness::Correct,
            Some(false) => Correctness::Incorrect,
        }
    }
}

impl From<Correctness> for Option<bool> {
    fn from(value: Correctness) -> Self {
        match value {
            Correctness::Unknown => None,
            Correctness::Correct => Some(true),
            Correctness::Incorrect => Some(false),
        }
    }
}

impl Correctness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Correctness::Unknown => "unknown",
            Correctness::Correct => "correct",
            Correctness::Incorrect => "incorrect",
        }
    }
}

/// Row of the `user_puzzle_attempts` table. One row per (user, puzzle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub user_id: String,
    pub puzzle_id: i64,
    pub answer: String,
    #[serde(rename = "is_correct", default)]
    pub correctness: Correctness,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAttempt {
    pub user_id: String,
    pub puzzle_id: i64,
    pub answer: String,
    #[serde(rename = "is_correct")]
    pub correctness: Correctness,
    pub submitted_at: DateTime<Utc>,
}

/// Fields overwritten on every re-submission.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptPatch {
    pub answer: String,
    #[serde(rename = "is_correct")]
    pub correctness: Correctness,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub puzzle_id: i64,
    pub answer: String,
    pub is_correct: Correctness,
    pub submitted_at: DateTime<Utc>,
}

impl From<&AttemptRecord> for AttemptSummary {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            puzzle_id: record.puzzle_id,
            answer: record.answer.clone(),
            is_correct: record.correctness,
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Answer must be between 1 and 2000 characters"
    ))]
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SubmissionRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PuzzleStatus>,
    pub message: String,
}
