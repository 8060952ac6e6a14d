use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::user::{AdminUsersResponse, Profile},
    services::AppState,
};

/// GET /admin/users - All participant profiles, newest first (Admin)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Profile>,
) -> Result<Json<AdminUsersResponse>, ApiError> {
    let users = state.store.list_profiles().await.map_err(|e| {
        tracing::error!("Failed to list profiles: {}", e);
        ApiError::from(e)
    })?;

    tracing::info!(admin_id = %admin.id, total = users.len(), "Admin listed users");

    let total = users.len();
    Ok(Json(AdminUsersResponse { users, total }))
}
