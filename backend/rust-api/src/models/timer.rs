use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::competition::{Phase, Remaining};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CountdownEvent {
    CountdownTick(CountdownTick),
    PhaseChanged(PhaseChanged),
    CompetitionEnded(CompetitionEnded),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CountdownTick {
    pub phase: Phase,
    pub remaining: Option<Remaining>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhaseChanged {
    pub from: Phase,
    pub to: Phase,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompetitionEnded {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl CountdownEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            CountdownEvent::CountdownTick(_) => "countdown-tick",
            CountdownEvent::PhaseChanged(_) => "phase-changed",
            CountdownEvent::CompetitionEnded(_) => "competition-ended",
        }
    }
}
