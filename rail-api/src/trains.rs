use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use rail_core::models::{NewTrain, Train, TrainId, TrainPatch};
use rail_core::Role;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::{authenticate, require_role};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchTrainsQuery {
    pub source_station: Option<String>,
    pub destination_station: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: String,
    pub train: Train,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatsResponse {
    pub available_seats: i64,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/trains", post(create_train))
        .route("/trains/{id}", put(update_train).delete(delete_train))
        .route_layer(from_fn_with_state(Role::Administrator, require_role))
        .route_layer(from_fn_with_state(state, authenticate));

    Router::new()
        .route("/trains", get(search_trains))
        .route("/trains/{id}/seats", get(available_seats))
        .merge(admin)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /trains
async fn create_train(
    State(state): State<AppState>,
    payload: Result<Json<NewTrain>, JsonRejection>,
) -> Result<(StatusCode, Json<TrainResponse>), AppError> {
    let Json(req) = payload?;
    let train = state.catalog.create(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(TrainResponse {
            message: "Train added successfully".to_string(),
            train,
        }),
    ))
}

/// PUT /trains/{id}
async fn update_train(
    State(state): State<AppState>,
    id: Result<Path<TrainId>, PathRejection>,
    payload: Result<Json<TrainPatch>, JsonRejection>,
) -> Result<Json<TrainResponse>, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let train = state.catalog.update(id, patch).await?;

    Ok(Json(TrainResponse {
        message: "Train details updated successfully".to_string(),
        train,
    }))
}

/// DELETE /trains/{id}
async fn delete_train(
    State(state): State<AppState>,
    id: Result<Path<TrainId>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.catalog.delete(id).await?;

    Ok(Json(MessageResponse {
        message: "Train removed successfully".to_string(),
    }))
}

/// GET /trains?source_station=&destination_station=
async fn search_trains(
    State(state): State<AppState>,
    query: Result<Query<SearchTrainsQuery>, QueryRejection>,
) -> Result<Json<Vec<Train>>, AppError> {
    let Query(query) = query?;
    let trains = state
        .catalog
        .search(query.source_station.as_deref(), query.destination_station.as_deref())
        .await?;

    Ok(Json(trains))
}

/// GET /trains/{id}/seats
async fn available_seats(
    State(state): State<AppState>,
    id: Result<Path<TrainId>, PathRejection>,
) -> Result<Json<SeatsResponse>, AppError> {
    let Path(id) = id?;
    let available_seats = state.availability.available(id).await?;

    Ok(Json(SeatsResponse { available_seats }))
}
