// Event business logic: CRUD, filtering and image management

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::categories::CategoryRepository;
use crate::error::{ServiceError, ServiceResult};
use crate::events::models::{
    EventDetails, EventFilter, EventRequest, EventResponse, ImageResponse, ImageUpload, NewImage,
};
use crate::events::repository::EventRepository;
use crate::pagination::{PagedList, PaginationParams};
use crate::storage::BlobStore;
use crate::validation::ensure_future;

/// Largest accepted image upload
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct EventService {
    events: Arc<dyn EventRepository>,
    categories: Arc<dyn CategoryRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl EventService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        categories: Arc<dyn CategoryRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            events,
            categories,
            blobs,
        }
    }

    pub async fn list(
        &self,
        pagination: PaginationParams,
        filter: EventFilter,
    ) -> ServiceResult<PagedList<EventResponse>> {
        let filter = filter.normalized()?;
        let page = pagination.normalize();
        let (events, total) = self.events.list(&filter, page).await?;
        debug!("Listed {} of {} events", events.len(), total);
        Ok(PagedList::new(events, page, total).map(EventResponse::from))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<EventResponse> {
        Ok(self.details(id).await?.into())
    }

    pub async fn create(&self, request: EventRequest) -> ServiceResult<EventResponse> {
        request.validate()?;
        ensure_future(request.starts_at, Utc::now())?;
        self.ensure_category(request.category_id).await?;

        let event = self.events.insert(request.into_new_event()).await?;
        info!("Created event {}", event.id);

        Ok(self.details(event.id).await?.into())
    }

    pub async fn update(&self, id: Uuid, request: EventRequest) -> ServiceResult<EventResponse> {
        request.validate()?;
        ensure_future(request.starts_at, Utc::now())?;

        let current = self.details(id).await?;
        if current.event.category_id != request.category_id {
            self.ensure_category(request.category_id).await?;
        }
        if i64::from(request.max_participants) < current.participant_count {
            return Err(ServiceError::invalid_input(format!(
                "Maximum participants cannot be lower than the {} already registered",
                current.participant_count
            )));
        }

        self.events
            .update(id, request.into_new_event())
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", id))?;
        info!("Updated event {}", id);

        Ok(self.details(id).await?.into())
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let current = self.details(id).await?;

        if !self.events.delete(id).await? {
            return Err(ServiceError::not_found("Event", id));
        }
        info!("Deleted event {}", id);

        if let Some(image) = current.image {
            self.remove_blob(&image.path).await;
        }
        Ok(())
    }

    /// Stores a new image and replaces the previous one, if any
    pub async fn upload_image(&self, event_id: Uuid, upload: ImageUpload) -> ServiceResult<ImageResponse> {
        validate_upload(&upload)?;
        self.details(event_id).await?;

        let locator = self
            .blobs
            .save(&format!("events/{}", event_id), &upload.file_name, &upload.bytes)
            .await?;

        let image = NewImage {
            path: locator.clone(),
            content_type: upload.content_type,
            uploaded_at: Utc::now(),
        };
        let (stored, previous) = match self.events.replace_image(event_id, image).await {
            Ok(result) => result,
            Err(e) => {
                // The row was not written; do not leave the new blob behind
                self.remove_blob(&locator).await;
                return Err(e);
            }
        };

        if let Some(previous) = previous {
            self.remove_blob(&previous.path).await;
        }
        info!("Stored image {} for event {}", stored.id, event_id);
        Ok(stored.into())
    }

    /// Removes the event image; succeeds when there is none
    pub async fn delete_image(&self, event_id: Uuid) -> ServiceResult<()> {
        self.details(event_id).await?;

        match self.events.delete_image(event_id).await? {
            Some(image) => {
                info!("Deleted image {} of event {}", image.id, event_id);
                self.remove_blob(&image.path).await;
            }
            None => debug!("Event {} has no image to delete", event_id),
        }
        Ok(())
    }

    async fn details(&self, id: Uuid) -> ServiceResult<EventDetails> {
        self.events
            .find_details(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", id))
    }

    async fn ensure_category(&self, category_id: Uuid) -> ServiceResult<()> {
        match self.categories.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("Category", category_id)),
        }
    }

    /// Blob cleanup is best effort; failures are logged only
    async fn remove_blob(&self, locator: &str) {
        if let Err(e) = self.blobs.delete(locator).await {
            warn!("Failed to remove blob {}: {}", locator, e);
        }
    }
}

fn validate_upload(upload: &ImageUpload) -> ServiceResult<()> {
    if upload.bytes.is_empty() {
        return Err(ServiceError::invalid_input("Image file is empty"));
    }
    if upload.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ServiceError::invalid_input(format!(
            "Image must not exceed {} MB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    if !upload.content_type.starts_with("image/") {
        return Err(ServiceError::invalid_input("Only image uploads are accepted"));
    }
    Ok(())
}
