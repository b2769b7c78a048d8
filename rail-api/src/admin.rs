use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get},
    Extension, Json, Router,
};
use rail_core::models::User;
use rail_core::{Identity, Role};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::{authenticate, require_role};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// User administration. Both routes are destructive or expose credentials, so they sit
/// behind the administrator gate.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/delete/user", delete(purge_users))
        .route("/usersdata", get(list_users))
        .route_layer(from_fn_with_state(Role::Administrator, require_role))
        .route_layer(from_fn_with_state(state, authenticate))
}

/// DELETE /delete/user
async fn purge_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MessageResponse>, AppError> {
    state.users.purge_users().await?;
    tracing::warn!(by = %identity.username, "All users and their bookings were purged");

    Ok(Json(MessageResponse {
        message: "All users and dependent bookings deleted successfully".to_string(),
    }))
}

/// GET /usersdata
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}
