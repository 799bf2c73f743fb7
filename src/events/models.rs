// Event, image and participation data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::categories::{Category, CategoryResponse};
use crate::error::{ServiceError, ServiceResult};

/// Event as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub max_participants: i32,
    pub category_id: Uuid,
}

/// Image metadata; `path` is a locator into the blob store
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub event_id: Uuid,
    pub path: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub path: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Event with its category, image and current participant count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub event: Event,
    pub category: Category,
    pub image: Option<Image>,
    pub participant_count: i64,
}

impl EventDetails {
    pub fn is_full(&self) -> bool {
        self.participant_count >= i64::from(self.event.max_participants)
    }
}

/// Fields written on create and update
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub max_participants: i32,
    pub category_id: Uuid,
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EventRequest {
    #[validate(length(min = 1, max = 200), custom = "crate::validation::validate_not_blank")]
    #[schema(example = "Summer Jazz Night")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: String,
    /// Must lie in the future
    pub starts_at: DateTime<Utc>,
    #[validate(length(min = 1, max = 300), custom = "crate::validation::validate_not_blank")]
    pub location: String,
    #[validate(range(min = 1))]
    pub max_participants: i32,
    pub category_id: Uuid,
}

impl EventRequest {
    pub fn into_new_event(self) -> NewEvent {
        NewEvent {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            starts_at: self.starts_at,
            location: self.location.trim().to_string(),
            max_participants: self.max_participants,
            category_id: self.category_id,
        }
    }
}

/// Optional listing filters; text filters are case-insensitive
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EventFilter {
    /// Inclusive lower bound on the start time
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the start time
    pub date_to: Option<DateTime<Utc>>,
    /// Substring of the location
    pub location: Option<String>,
    /// Exact category name
    pub category_name: Option<String>,
    /// Exact event name
    pub event_name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl EventFilter {
    /// Trims text filters, drops blank ones and checks the date range
    pub fn normalized(self) -> ServiceResult<Self> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if to < from {
                return Err(ServiceError::invalid_input(
                    "date_to must not be earlier than date_from",
                ));
            }
        }

        Ok(Self {
            date_from: self.date_from,
            date_to: self.date_to,
            location: non_blank(self.location),
            category_name: non_blank(self.category_name),
            event_name: non_blank(self.event_name),
        })
    }

    pub fn matches(&self, details: &EventDetails) -> bool {
        let event = &details.event;
        self.date_from.map_or(true, |from| event.starts_at >= from)
            && self.date_to.map_or(true, |to| event.starts_at <= to)
            && self.location.as_ref().map_or(true, |loc| {
                event.location.to_lowercase().contains(&loc.to_lowercase())
            })
            && self.category_name.as_ref().map_or(true, |name| {
                details.category.name.to_lowercase() == name.to_lowercase()
            })
            && self
                .event_name
                .as_ref()
                .map_or(true, |name| event.name.to_lowercase() == name.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct EventParticipation {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
}

/// A participation joined with the event it refers to
#[derive(Debug, Clone)]
pub struct ParticipatedEvent {
    pub registered_at: DateTime<Utc>,
    pub event: EventDetails,
}

/// Raw upload handed to the event service
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    /// Public URL served from the image directory
    #[schema(example = "/images/events/3f1c/7a2e.png")]
    pub url: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            id: image.id,
            url: format!("/images/{}", image.path),
            content_type: image.content_type,
            uploaded_at: image.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub max_participants: i32,
    pub participant_count: i64,
    pub category: CategoryResponse,
    pub image: Option<ImageResponse>,
}

impl From<EventDetails> for EventResponse {
    fn from(details: EventDetails) -> Self {
        let EventDetails {
            event,
            category,
            image,
            participant_count,
        } = details;
        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            starts_at: event.starts_at,
            location: event.location,
            max_participants: event.max_participants,
            participant_count,
            category: category.into(),
            image: image.map(ImageResponse::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParticipatedEventResponse {
    pub registered_at: DateTime<Utc>,
    pub event: EventResponse,
}

impl From<ParticipatedEvent> for ParticipatedEventResponse {
    fn from(participation: ParticipatedEvent) -> Self {
        Self {
            registered_at: participation.registered_at,
            event: participation.event.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn details(name: &str, location: &str, category: &str, starts_at: DateTime<Utc>) -> EventDetails {
        let category_id = Uuid::new_v4();
        EventDetails {
            event: Event {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: String::new(),
                starts_at,
                location: location.to_string(),
                max_participants: 2,
                category_id,
            },
            category: Category {
                id: category_id,
                name: category.to_string(),
            },
            image: None,
            participant_count: 0,
        }
    }

    #[test]
    fn test_reversed_date_range_rejected() {
        let now = Utc::now();
        let filter = EventFilter {
            date_from: Some(now),
            date_to: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(filter.normalized().is_err());
    }

    #[test]
    fn test_blank_text_filters_are_dropped() {
        let filter = EventFilter {
            location: Some("   ".to_string()),
            event_name: Some(" Jazz ".to_string()),
            ..Default::default()
        }
        .normalized()
        .unwrap();

        assert!(filter.location.is_none());
        assert_eq!(filter.event_name.as_deref(), Some("Jazz"));
    }

    #[test]
    fn test_filter_matching() {
        let now = Utc::now();
        let event = details("Jazz Night", "Blue Note, Berlin", "Concerts", now);

        let by_location = EventFilter {
            location: Some("berlin".to_string()),
            ..Default::default()
        };
        assert!(by_location.matches(&event));

        let by_category = EventFilter {
            category_name: Some("CONCERTS".to_string()),
            ..Default::default()
        };
        assert!(by_category.matches(&event));

        let partial_name = EventFilter {
            event_name: Some("Jazz".to_string()),
            ..Default::default()
        };
        assert!(!partial_name.matches(&event));

        let inclusive = EventFilter {
            date_from: Some(now),
            date_to: Some(now),
            ..Default::default()
        };
        assert!(inclusive.matches(&event));
    }

    #[test]
    fn test_capacity_check() {
        let mut event = details("Jazz", "Berlin", "Concerts", Utc::now());
        assert!(!event.is_full());
        event.participant_count = 2;
        assert!(event.is_full());
    }

    #[test]
    fn test_image_url_points_at_static_route() {
        let image = Image {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            path: "events/1/a.png".to_string(),
            content_type: "image/png".to_string(),
            uploaded_at: Utc::now(),
        };
        assert_eq!(ImageResponse::from(image).url, "/images/events/1/a.png");
    }

    #[test]
    fn test_request_validation_limits() {
        let request = EventRequest {
            name: "a".repeat(201),
            description: "d".repeat(2001),
            starts_at: Utc::now(),
            location: "Berlin".to_string(),
            max_participants: 0,
            category_id: Uuid::new_v4(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("max_participants"));
    }
}
