use serde::{Deserialize, Serialize};

use super::{attempt::AttemptSummary, competition::CompetitionResponse};

/// Row of the `puzzles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: i64,
    pub name: String,
    /// Rendered as HTML by the front end.
    #[serde(rename = "description", default)]
    pub description_html: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub modal_image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleStatus {
    Locked,
    Attempted,
    Incorrect,
    Correct,
}

/// Where a visible puzzle sits on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutRole {
    /// Separate, always-present affordance outside the ring.
    Tutorial,
    /// Ring member; `angle` is in radians, `-π/2` is the top.
    Ring { index: usize, angle: f64 },
    /// Singular centre element.
    Capstone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PuzzleViewState {
    pub puzzle: Puzzle,
    pub status: PuzzleStatus,
    pub visible: bool,
    pub is_capstone: bool,
    pub layout: LayoutRole,
}

#[derive(Debug, Serialize)]
pub struct PuzzleDetailResponse {
    pub puzzle: Puzzle,
    pub status: PuzzleStatus,
    pub previous_attempt: Option<AttemptSummary>,
}

/// Everything the dashboard renders for one participant.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub competition: CompetitionResponse,
    pub can_submit: bool,
    pub all_base_solved: bool,
    /// Attempts could not be loaded; every puzzle is shown locked.
    pub attempts_degraded: bool,
    pub puzzles: Vec<PuzzleViewState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puzzle_row_maps_description_column() {
        let puzzle: Puzzle = serde_json::from_str(
            r#"{"id":3,"name":"Mirror of Ash","description":"<p>Look closer</p>","image_url":null}"#,
        )
        .unwrap();
        assert_eq!(puzzle.description_html, "<p>Look closer</p>");
        assert!(puzzle.is_active);
        assert!(puzzle.modal_image_url.is_none());
    }

    #[test]
    fn layout_role_is_tagged() {
        let json = serde_json::to_value(LayoutRole::Ring {
            index: 2,
            angle: 0.5,
        })
        .unwrap();
        assert_eq!(json["kind"], "ring");
        assert_eq!(json["index"], 2);
        assert_eq!(
            serde_json::to_value(LayoutRole::Capstone).unwrap()["kind"],
            "capstone"
        );
    }
}
