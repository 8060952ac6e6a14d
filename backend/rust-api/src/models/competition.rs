use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `competition_settings` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionSettings {
    #[serde(default)]
    pub id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// Start/end instants of the hunt as loaded from the store.
///
/// `start` is absent until the settings row has been loaded. When both are
/// present `start < end` is expected but not enforced here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompetitionWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CompetitionWindow {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start: Some(start),
            end,
        }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.start.is_some()
    }
}

impl From<CompetitionSettings> for CompetitionWindow {
    fn from(settings: CompetitionSettings) -> Self {
        Self {
            start: settings.start_date,
            end: settings.end_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotConfigured,
    NotStarted,
    Active,
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotConfigured => "not_configured",
            Phase::NotStarted => "not_started",
            Phase::Active => "active",
            Phase::Ended => "ended",
        }
    }
}

/// Countdown breakdown of a non-negative duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    /// Floor-decomposes `duration`; negative durations clamp to zero and
    /// sub-second fractions are dropped.
    pub fn from_duration(duration: Duration) -> Self {
        let total = duration.num_seconds().max(0) as u64;
        Self {
            days: total / 86_400,
            hours: (total / 3_600) % 24,
            minutes: (total / 60) % 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub phase: Phase,
    pub remaining: Option<Remaining>,
}

/// Why a submission was turned away by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionRejection {
    NotConfigured,
    NotStarted,
    Ended,
}

impl SubmissionRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionRejection::NotConfigured => "not_configured",
            SubmissionRejection::NotStarted => "not_started",
            SubmissionRejection::Ended => "ended",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SubmissionRejection::NotConfigured => "The hunt has not been scheduled yet",
            SubmissionRejection::NotStarted => "The hunt has not started yet",
            SubmissionRejection::Ended => "The hunt has ended; submissions are closed",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompetitionResponse {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub phase: Phase,
    pub remaining: Option<Remaining>,
    pub server_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_floors_each_unit() {
        let remaining = Remaining::from_duration(Duration::seconds(90_061));
        assert_eq!(
            remaining,
            Remaining {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(remaining.total_seconds(), 90_061);
    }

    #[test]
    fn remaining_drops_sub_second_fraction() {
        let remaining = Remaining::from_duration(Duration::milliseconds(59_999));
        assert_eq!(remaining.seconds, 59);
        assert_eq!(remaining.minutes, 0);
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(
            Remaining::from_duration(Duration::seconds(-5)),
            Remaining::default()
        );
    }

    #[test]
    fn settings_row_parses_postgrest_timestamps() {
        let row: CompetitionSettings = serde_json::from_str(
            r#"{"id":1,"start_date":"2025-03-01T18:00:00+00:00","end_date":null,"is_active":true}"#,
        )
        .unwrap();
        let window = CompetitionWindow::from(row);
        assert!(window.is_configured());
        assert!(window.end.is_none());
    }
}
