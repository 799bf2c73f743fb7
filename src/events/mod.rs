// Events module
// Event CRUD with filtering, single-image attachments and participation storage

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{
    Event, EventDetails, EventFilter, EventParticipation, EventRequest, EventResponse, Image,
    ImageResponse, ImageUpload, NewEvent, NewImage, ParticipatedEvent, ParticipatedEventResponse,
};
pub use repository::{
    EventRepository, ParticipationRepository, PgEventRepository, PgParticipationRepository,
};
pub use service::{EventService, MAX_IMAGE_BYTES};
