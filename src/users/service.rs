// User profile and event participation logic

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{User, UserChanges, UserRepository};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::events::repository::{already_joined_error, capacity_error};
use crate::events::{EventRepository, EventResponse, ParticipatedEventResponse, ParticipationRepository};
use crate::pagination::{PagedList, PaginationParams};
use crate::users::models::{UpdateUserRequest, UserResponse};
use crate::validation::{ensure_adult, normalize_email};

pub struct UserService {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    participations: Arc<dyn ParticipationRepository>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        participations: Arc<dyn ParticipationRepository>,
    ) -> Self {
        Self {
            users,
            events,
            participations,
        }
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<UserResponse> {
        Ok(self.user(id).await?.into())
    }

    pub async fn list(&self, pagination: PaginationParams) -> ServiceResult<PagedList<UserResponse>> {
        let page = pagination.normalize();
        let (users, total) = self.users.list(page).await?;
        Ok(PagedList::new(users, page, total).map(UserResponse::from))
    }

    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> ServiceResult<UserResponse> {
        request.validate()?;
        ensure_adult(request.date_of_birth, Utc::now().date_naive())?;

        let existing = self.user(id).await?;
        let email = normalize_email(&request.email);
        if email != existing.email && self.users.email_taken(&email, Some(id)).await? {
            warn!("User {} attempted to take an existing email", id);
            return Err(ServiceError::already_exists("User with email", &email));
        }

        let changes = UserChanges {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            date_of_birth: request.date_of_birth,
        };
        let updated = self
            .users
            .update_profile(id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        info!("Updated user {}", id);
        Ok(updated.into())
    }

    /// Deletes the account along with its participations and sessions
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.users.delete(id).await? {
            return Err(ServiceError::not_found("User", id));
        }
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Registers the user for an event, subject to capacity
    pub async fn participate(&self, user_id: Uuid, event_id: Uuid) -> ServiceResult<ParticipatedEventResponse> {
        self.user(user_id).await?;
        let details = self
            .events
            .find_details(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;

        if self.participations.is_participant(event_id, user_id).await? {
            return Err(already_joined_error());
        }
        if details.is_full() {
            debug!("Event {} is full", event_id);
            return Err(capacity_error());
        }

        let participation = self
            .participations
            .add_participant(event_id, user_id, Utc::now())
            .await?;
        info!("User {} joined event {}", user_id, event_id);

        let event: EventResponse = self
            .events
            .find_details(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?
            .into();
        Ok(ParticipatedEventResponse {
            registered_at: participation.registered_at,
            event,
        })
    }

    pub async fn cancel_participation(&self, user_id: Uuid, event_id: Uuid) -> ServiceResult<()> {
        if !self.participations.remove_participant(event_id, user_id).await? {
            return Err(ServiceError::new(
                ErrorKind::RecordNotFound,
                format!("User is not participating in event {}", event_id),
            ));
        }
        info!("User {} left event {}", user_id, event_id);
        Ok(())
    }

    pub async fn participated_events(
        &self,
        user_id: Uuid,
        pagination: PaginationParams,
    ) -> ServiceResult<PagedList<ParticipatedEventResponse>> {
        self.user(user_id).await?;
        let page = pagination.normalize();
        let (items, total) = self.participations.list_for_user(user_id, page).await?;
        Ok(PagedList::new(items, page, total).map(ParticipatedEventResponse::from))
    }

    async fn user(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }
}
