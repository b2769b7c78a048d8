use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use rail_core::booking::BookingRequest;
use rail_core::models::{Booking, BookingDetails, BookingId, UserId};
use rail_core::{Identity, Role};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::middleware::authenticate;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: String,
    pub booking: Booking,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/bookings", post(create_booking))
        .route_layer(from_fn_with_state(state, authenticate));

    Router::new()
        .route("/bookings/{id}", get(get_booking))
        .merge(authenticated)
}

/// POST /bookings
///
/// Responds 201 only once the booking's transaction has committed.
async fn create_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let Json(req) = payload?;
    if let Some(user_id) = req.user_id {
        ensure_books_for_self(&state, &identity, user_id).await?;
    }

    let booking = state.coordinator.book(&req).await?;
    info!(booking_id = booking.id, requested_by = %identity.username, "Booking successful");

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            message: "Booking successful".to_string(),
            booking,
        }),
    ))
}

/// Users book only for their own account; administrators may book for anyone.
async fn ensure_books_for_self(
    state: &AppState,
    identity: &Identity,
    user_id: UserId,
) -> Result<(), AppError> {
    if identity.role == Role::Administrator {
        return Ok(());
    }

    let caller = state.users.find_by_username(&identity.username).await?;
    if caller.map(|u| u.id) != Some(user_id) {
        tracing::warn!(
            username = %identity.username,
            user_id,
            "Booking for another account refused"
        );
        return Err(AppError::AuthorizationError("Access denied.".to_string()));
    }
    Ok(())
}

/// GET /bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    id: Result<Path<BookingId>, PathRejection>,
) -> Result<Json<BookingDetails>, AppError> {
    let Path(id) = id?;

    let details = state
        .bookings
        .booking_details(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    Ok(Json(details))
}
