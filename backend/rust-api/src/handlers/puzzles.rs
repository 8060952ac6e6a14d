use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::SessionClaims,
    models::{
        attempt::{SubmitAnswerRequest, SubmitAnswerResponse},
        puzzle::PuzzleDetailResponse,
    },
    services::{
        dashboard_service::DashboardService, submission_service::SubmissionService, AppState,
    },
};

/// GET /api/v1/puzzles/{id}
pub async fn get_puzzle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(puzzle_id): Path<i64>,
) -> Result<Json<PuzzleDetailResponse>, ApiError> {
    let service = DashboardService::new(&state);
    Ok(Json(service.puzzle_detail(&claims.sub, puzzle_id).await?))
}

/// POST /api/v1/puzzles/{id}/answers
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(puzzle_id): Path<i64>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let service = SubmissionService::new(&state);
    let response = service.submit(&claims.sub, puzzle_id, &req).await.map_err(|e| {
        tracing::warn!(user_id = %claims.sub, puzzle_id, "Submission failed: {:?}", e);
        e
    })?;
    Ok(Json(response))
}
