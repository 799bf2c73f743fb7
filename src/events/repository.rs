// Event, image and participation persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::categories::Category;
use crate::error::{is_unique_violation, ErrorKind, ServiceError, ServiceResult};
use crate::events::models::{
    Event, EventDetails, EventFilter, EventParticipation, Image, NewEvent, NewImage,
    ParticipatedEvent,
};
use crate::pagination::Page;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Matching events ordered by start time (latest first), plus the total match count
    async fn list(&self, filter: &EventFilter, page: Page) -> ServiceResult<(Vec<EventDetails>, u64)>;

    async fn find_details(&self, id: Uuid) -> ServiceResult<Option<EventDetails>>;

    async fn insert(&self, event: NewEvent) -> ServiceResult<Event>;

    async fn update(&self, id: Uuid, event: NewEvent) -> ServiceResult<Option<Event>>;

    /// Deletes the event together with its image row and participations
    async fn delete(&self, id: Uuid) -> ServiceResult<bool>;

    /// Swaps the event image in one unit of work, returning the new row and the replaced one
    async fn replace_image(&self, event_id: Uuid, image: NewImage) -> ServiceResult<(Image, Option<Image>)>;

    /// Removes and returns the event image row, if any
    async fn delete_image(&self, event_id: Uuid) -> ServiceResult<Option<Image>>;
}

#[async_trait]
pub trait ParticipationRepository: Send + Sync {
    async fn is_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool>;

    /// Adds the participation if capacity allows.
    /// Full event → InvalidInput, already joined → AlreadyExists.
    async fn add_participant(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> ServiceResult<EventParticipation>;

    async fn remove_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool>;

    /// Participations of a user ordered by registration time (latest first)
    async fn list_for_user(&self, user_id: Uuid, page: Page) -> ServiceResult<(Vec<ParticipatedEvent>, u64)>;
}

pub(crate) fn capacity_error() -> ServiceError {
    ServiceError::invalid_input("Event has reached its maximum number of participants")
}

pub(crate) fn already_joined_error() -> ServiceError {
    ServiceError::new(
        ErrorKind::AlreadyExists,
        "User is already participating in this event",
    )
}

const DETAILS_SELECT: &str = "SELECT e.id, e.name, e.description, e.starts_at, e.location,
        e.max_participants, e.category_id, c.name AS category_name,
        i.id AS image_id, i.path AS image_path, i.content_type AS image_content_type,
        i.uploaded_at AS image_uploaded_at,
        (SELECT COUNT(*) FROM event_participants p WHERE p.event_id = e.id) AS participant_count
    FROM events e
    JOIN categories c ON c.id = e.category_id
    LEFT JOIN images i ON i.event_id = e.id";

const EVENT_COLUMNS: &str =
    "id, name, description, starts_at, location, max_participants, category_id";

const IMAGE_COLUMNS: &str = "id, event_id, path, content_type, uploaded_at";

/// Flat row produced by `DETAILS_SELECT`
#[derive(Debug, FromRow)]
struct EventDetailsRow {
    id: Uuid,
    name: String,
    description: String,
    starts_at: DateTime<Utc>,
    location: String,
    max_participants: i32,
    category_id: Uuid,
    category_name: String,
    image_id: Option<Uuid>,
    image_path: Option<String>,
    image_content_type: Option<String>,
    image_uploaded_at: Option<DateTime<Utc>>,
    participant_count: i64,
}

impl From<EventDetailsRow> for EventDetails {
    fn from(row: EventDetailsRow) -> Self {
        let image = match (row.image_id, row.image_path, row.image_content_type, row.image_uploaded_at) {
            (Some(id), Some(path), Some(content_type), Some(uploaded_at)) => Some(Image {
                id,
                event_id: row.id,
                path,
                content_type,
                uploaded_at,
            }),
            _ => None,
        };

        EventDetails {
            event: Event {
                id: row.id,
                name: row.name,
                description: row.description,
                starts_at: row.starts_at,
                location: row.location,
                max_participants: row.max_participants,
                category_id: row.category_id,
            },
            category: Category {
                id: row.category_id,
                name: row.category_name,
            },
            image,
            participant_count: row.participant_count,
        }
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    builder.push(" WHERE TRUE");
    if let Some(from) = filter.date_from {
        builder.push(" AND e.starts_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND e.starts_at <= ").push_bind(to);
    }
    if let Some(location) = &filter.location {
        builder
            .push(" AND e.location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(category) = &filter.category_name {
        builder
            .push(" AND LOWER(c.name) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(name) = &filter.event_name {
        builder
            .push(" AND LOWER(e.name) = LOWER(")
            .push_bind(name.clone())
            .push(")");
    }
}

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn list(&self, filter: &EventFilter, page: Page) -> ServiceResult<(Vec<EventDetails>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM events e JOIN categories c ON c.id = e.category_id",
        );
        push_filters(&mut count, filter);
        let total = count.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY e.starts_at DESC, e.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query.build_query_as::<EventDetailsRow>().fetch_all(&self.pool).await?;

        Ok((
            rows.into_iter().map(EventDetails::from).collect(),
            total.0.max(0) as u64,
        ))
    }

    async fn find_details(&self, id: Uuid) -> ServiceResult<Option<EventDetails>> {
        let row = sqlx::query_as::<_, EventDetailsRow>(&format!("{} WHERE e.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EventDetails::from))
    }

    async fn insert(&self, event: NewEvent) -> ServiceResult<Event> {
        let created = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (name, description, starts_at, location, max_participants, category_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(&event.location)
        .bind(event.max_participants)
        .bind(event.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, event: NewEvent) -> ServiceResult<Option<Event>> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events
             SET name = $2, description = $3, starts_at = $4, location = $5,
                 max_participants = $6, category_id = $7
             WHERE id = $1
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(&event.location)
        .bind(event.max_participants)
        .bind(event.category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        // images and event_participants cascade
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_image(&self, event_id: Uuid, image: NewImage) -> ServiceResult<(Image, Option<Image>)> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, Image>(&format!(
            "DELETE FROM images WHERE event_id = $1 RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let stored = sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO images (event_id, path, content_type, uploaded_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(event_id)
        .bind(&image.path)
        .bind(&image.content_type)
        .bind(image.uploaded_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((stored, previous))
    }

    async fn delete_image(&self, event_id: Uuid) -> ServiceResult<Option<Image>> {
        let removed = sqlx::query_as::<_, Image>(&format!(
            "DELETE FROM images WHERE event_id = $1 RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(removed)
    }
}

#[derive(Clone)]
pub struct PgParticipationRepository {
    pool: PgPool,
}

impl PgParticipationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ParticipatedRow {
    registered_at: DateTime<Utc>,
    #[sqlx(flatten)]
    event: EventDetailsRow,
}

#[async_trait]
impl ParticipationRepository for PgParticipationRepository {
    async fn is_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    async fn add_participant(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> ServiceResult<EventParticipation> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent joins on the same event
        let max: Option<(i32,)> =
            sqlx::query_as("SELECT max_participants FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (max_participants,) = max.ok_or_else(|| ServiceError::not_found("Event", event_id))?;

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_participants WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        if count.0 >= i64::from(max_participants) {
            return Err(capacity_error());
        }

        let participation = sqlx::query_as::<_, EventParticipation>(
            "INSERT INTO event_participants (event_id, user_id, registered_at)
             VALUES ($1, $2, $3)
             RETURNING event_id, user_id, registered_at",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(registered_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_joined_error()
            } else {
                ServiceError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(participation)
    }

    async fn remove_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        let result =
            sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND user_id = $2")
                .bind(event_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(&self, user_id: Uuid, page: Page) -> ServiceResult<(Vec<ParticipatedEvent>, u64)> {
        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_participants WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ParticipatedRow>(&format!(
            "SELECT ep.registered_at, d.*
             FROM event_participants ep
             JOIN ({}) d ON d.id = ep.event_id
             WHERE ep.user_id = $1
             ORDER BY ep.registered_at DESC, d.id
             LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let participations = rows
            .into_iter()
            .map(|row| ParticipatedEvent {
                registered_at: row.registered_at,
                event: row.event.into(),
            })
            .collect();

        Ok((participations, total.0.max(0) as u64))
    }
}
