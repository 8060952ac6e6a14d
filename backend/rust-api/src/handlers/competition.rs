use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::competition::CompetitionResponse,
    services::{dashboard_service::DashboardService, AppState},
};

/// GET /api/v1/competition - Window, phase and remaining time at request time
pub async fn get_competition(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CompetitionResponse>, ApiError> {
    let service = DashboardService::new(&state);
    Ok(Json(service.competition().await?))
}
