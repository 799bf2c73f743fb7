// HTTP handlers for user profile and participation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::error::{ErrorResponse, ServiceError};
use crate::events::ParticipatedEventResponse;
use crate::pagination::{PagedList, PagedParticipations, PagedUsers, PaginationParams};
use crate::users::models::{UpdateUserRequest, UserResponse};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile of the caller", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(state.user_service.get(user.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(state.user_service.update(user.user_id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/me",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ServiceError> {
    state.user_service.delete(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/me/events",
    params(PaginationParams),
    responses(
        (status = 200, description = "Events the caller joined, latest first", body = PagedParticipations)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn my_events_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PagedList<ParticipatedEventResponse>>, ServiceError> {
    Ok(Json(
        state
            .user_service
            .participated_events(user.user_id, pagination)
            .await?,
    ))
}

/// Admin only
#[utoipa::path(
    get,
    path = "/api/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Users ordered by last then first name", body = PagedUsers),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PagedList<UserResponse>>, ServiceError> {
    Ok(Json(state.user_service.list(pagination).await?))
}

/// Admin only
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(state.user_service.get(id).await?))
}

/// Admin or the user themself
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, axum::response::Response> {
    user.require_self_or_admin(id).map_err(into_response)?;
    let updated = state
        .user_service
        .update(id, request)
        .await
        .map_err(into_response)?;
    Ok(Json(updated))
}

/// Admin or the user themself
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, axum::response::Response> {
    user.require_self_or_admin(id).map_err(into_response)?;
    state.user_service.delete(id).await.map_err(into_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/users/participate/{event_id}",
    params(("event_id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 201, description = "Joined the event", body = ParticipatedEventResponse),
        (status = 400, description = "Event is full", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Already participating", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn participate_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ParticipatedEventResponse>), ServiceError> {
    let joined = state
        .user_service
        .participate(user.user_id, event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

#[utoipa::path(
    delete,
    path = "/api/users/participate/{event_id}",
    params(("event_id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Participation cancelled"),
        (status = 404, description = "Not participating", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn cancel_participation_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .user_service
        .cancel_participation(user.user_id, event_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn into_response(err: impl axum::response::IntoResponse) -> axum::response::Response {
    err.into_response()
}
