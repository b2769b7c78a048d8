use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use rail_core::{Identity, Role};

use crate::error::AppError;
use crate::state::AppState;

fn no_token() -> AppError {
    AppError::AuthenticationError("Access denied. No token provided.".to_string())
}

// ============================================================================
// Authenticator
// ============================================================================

/// Verifies the bearer token and stores the caller's [`Identity`] in the request
/// extensions. No token is 401; a token that fails verification is 400.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(no_token)?;

    let identity = state.tokens.verify(token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        AppError::from(e)
    })?;

    tracing::debug!(username = %identity.username, role = %identity.role, "Authenticated");
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

// ============================================================================
// Authorizer
// ============================================================================

/// Requires the identity attached by [`authenticate`] to hold `required`. A request
/// that was never authenticated is refused as such, not as a role mismatch.
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req.extensions().get::<Identity>().ok_or_else(no_token)?;

    if identity.role != required {
        tracing::warn!(
            username = %identity.username,
            role = %identity.role,
            required = %required,
            "Role check failed"
        );
        return Err(AppError::AuthorizationError("Access denied.".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::Params;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use rail_core::Argon2Hasher;
    use rail_store::MemoryStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::state::AuthConfig;

    fn state() -> AppState {
        let hasher = Arc::new(Argon2Hasher::with_params(Params::new(1024, 1, 1, None).unwrap()));
        let auth = AuthConfig {
            secret: "middleware-secret".to_string(),
            expiration: 3600,
            default_role: Role::User,
        };
        AppState::new(MemoryStore::new(), hasher, &auth)
    }

    fn admin_only(state: AppState) -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(Role::Administrator, require_role))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    fn token_for(state: &AppState, role: Role) -> String {
        state
            .tokens
            .issue(&Identity { username: "tester".to_string(), role })
            .unwrap()
    }

    async fn call(app: Router, authorization: Option<String>) -> StatusCode {
        let mut request = axum::http::Request::builder().uri("/admin");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let state = state();
        assert_eq!(call(admin_only(state.clone()), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(admin_only(state), Some("Basic abc".to_string())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_bad_token_is_invalid() {
        let app = admin_only(state());
        assert_eq!(call(app, Some("Bearer nonsense".to_string())).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_token_is_forbidden_for_admin_route() {
        let state = state();
        let token = token_for(&state, Role::User);
        let status = call(admin_only(state), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_token_passes() {
        let state = state();
        let token = token_for(&state, Role::Administrator);
        let status = call(admin_only(state), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authorizer_without_authenticator_rejects_as_unauthenticated() {
        let state = state();
        let token = token_for(&state, Role::Administrator);
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(Role::Administrator, require_role));

        assert_eq!(call(app, Some(format!("Bearer {}", token))).await, StatusCode::UNAUTHORIZED);
    }
}
