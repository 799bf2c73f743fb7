// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{
    middleware::AuthenticatedUser,
    models::{LoginRequest, LogoutRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenPair},
};
use crate::error::{ErrorResponse, ServiceError};
use crate::users::UserResponse;
use crate::AppState;

/// Register a new user
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServiceError> {
    tracing::debug!("Registration request received");
    let user = state.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Login a user
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    let pair = state.auth_service.login(request).await?;
    Ok(Json(pair))
}

/// Rotate a refresh token
/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPair),
        (status = 400, description = "Refresh token missing", body = ErrorResponse),
        (status = 403, description = "Refresh token revoked or expired", body = ErrorResponse),
        (status = 404, description = "Refresh token unknown", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    let pair = state
        .auth_service
        .refresh_token(&request.refresh_token)
        .await?;
    Ok(Json(pair))
}

/// End the session bound to a refresh token
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state
        .auth_service
        .logout(request.refresh_token.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// End every session of the authenticated user
/// POST /api/auth/logout-all
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_all_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, ServiceError> {
    let revoked = state.auth_service.logout_all(user.user_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Revoked {} active sessions",
        revoked
    ))))
}
