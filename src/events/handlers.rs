// HTTP handlers for event endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ErrorResponse, ServiceError};
use crate::events::models::{EventFilter, EventRequest, EventResponse, ImageResponse, ImageUpload};
use crate::pagination::{PagedEvents, PagedList, PaginationParams};
use crate::AppState;

/// Multipart form accepted by the image upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(PaginationParams, EventFilter),
    responses(
        (status = 200, description = "Page of events, latest first", body = PagedEvents),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_events_handler(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<PagedList<EventResponse>>, ServiceError> {
    debug!("Listing events with filter {:?}", filter);
    Ok(Json(state.event_service.list(pagination, filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event found", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventResponse>, ServiceError> {
    Ok(Json(state.event_service.get(id).await?))
}

/// Admin only
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = EventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "events"
)]
pub async fn create_event_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ServiceError> {
    let event = state.event_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Admin only
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = EventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Event or category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "events"
)]
pub async fn update_event_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventResponse>, ServiceError> {
    Ok(Json(state.event_service.update(id, request).await?))
}

/// Admin only
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "events"
)]
pub async fn delete_event_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.event_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Admin only; expects a multipart field named `image`
#[utoipa::path(
    post,
    path = "/api/events/{id}/image",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 400, description = "Missing, empty, oversized or non-image file", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "events"
)]
pub async fn upload_event_image_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImageResponse>), ServiceError> {
    let upload = read_image_field(multipart).await?;
    debug!(
        "Received image '{}' ({} bytes) for event {}",
        upload.file_name,
        upload.bytes.len(),
        id
    );
    let image = state.event_service.upload_image(id, upload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// Admin only
#[utoipa::path(
    delete,
    path = "/api/events/{id}/image",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Image removed (or there was none)"),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "events"
)]
pub async fn delete_event_image_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.event_service.delete_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_image_field(mut multipart: Multipart) -> Result<ImageUpload, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::invalid_input(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::invalid_input(format!("Failed to read image: {}", e)))?;

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ServiceError::invalid_input("Multipart field 'image' is required"))
}
