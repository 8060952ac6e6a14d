use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::ApiError,
    middlewares::auth::SessionClaims,
    models::puzzle::DashboardResponse,
    services::{dashboard_service::DashboardService, AppState},
};

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let service = DashboardService::new(&state);
    let dashboard = service.dashboard(&claims.sub).await?;
    tracing::debug!(
        user_id = %claims.sub,
        visible = dashboard.puzzles.len(),
        degraded = dashboard.attempts_degraded,
        "Dashboard rendered"
    );
    Ok(Json(dashboard))
}
