use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json,
    Router,
};
use rail_core::accounts::{LoginRequest, SignupRequest};
use serde::Serialize;
use crate::{state::AppState, error::AppError};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;

    let identity = state.accounts.signup(&req).await?;
    let token = state.tokens.issue(&identity)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(req) = payload?;

    let identity = state.accounts.login(&req).await?;
    let token = state.tokens.issue(&identity)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
    }))
}
