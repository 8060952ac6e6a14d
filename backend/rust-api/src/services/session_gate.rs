//! Admission control for answer submissions.
//!
//! Always evaluated with the instant the request is handled, never with the
//! last countdown tick a client happened to render.

use chrono::{DateTime, Utc};

use super::time_window::classify_window;
use crate::models::{
    competition::{CompetitionWindow, Phase, SubmissionRejection},
    user::UserRole,
};

pub fn admit(
    now: DateTime<Utc>,
    window: &CompetitionWindow,
    role: UserRole,
) -> Result<(), SubmissionRejection> {
    if role == UserRole::Admin {
        return Ok(());
    }

    match classify_window(now, window).phase {
        Phase::NotConfigured => Err(SubmissionRejection::NotConfigured),
        Phase::NotStarted => Err(SubmissionRejection::NotStarted),
        Phase::Ended => Err(SubmissionRejection::Ended),
        Phase::Active => match window.end {
            Some(end) if now >= end => Err(SubmissionRejection::Ended),
            _ => Ok(()),
        },
    }
}

pub fn can_submit(now: DateTime<Utc>, window: &CompetitionWindow, role: UserRole) -> bool {
    admit(now, window, role).is_ok()
}
