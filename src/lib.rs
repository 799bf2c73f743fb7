pub mod auth;
pub mod categories;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod pagination;
pub mod storage;
pub mod users;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;


use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    handlers as auth_handlers, AuthService, JwtCodec, PgRefreshTokenRepository,
    PgUserRepository, TokenIssuer,
};
use categories::{handlers as category_handlers, CategoryService, PgCategoryRepository};
use config::AppConfig;
use events::{
    handlers as event_handlers, EventService, PgEventRepository, PgParticipationRepository,
    MAX_IMAGE_BYTES,
};
use storage::LocalFileStorage;
use users::{handlers as user_handlers, UserService};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::logout_handler,
        auth::handlers::logout_all_handler,
        categories::handlers::list_categories_handler,
        categories::handlers::get_category_handler,
        categories::handlers::create_category_handler,
        categories::handlers::update_category_handler,
        categories::handlers::delete_category_handler,
        events::handlers::list_events_handler,
        events::handlers::get_event_handler,
        events::handlers::create_event_handler,
        events::handlers::update_event_handler,
        events::handlers::delete_event_handler,
        events::handlers::upload_event_image_handler,
        events::handlers::delete_event_image_handler,
        users::handlers::get_me_handler,
        users::handlers::update_me_handler,
        users::handlers::delete_me_handler,
        users::handlers::my_events_handler,
        users::handlers::list_users_handler,
        users::handlers::get_user_handler,
        users::handlers::update_user_handler,
        users::handlers::delete_user_handler,
        users::handlers::participate_handler,
        users::handlers::cancel_participation_handler,
    ),
    components(
        schemas(
            error::ErrorResponse,
            auth::Role,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::LogoutRequest,
            auth::TokenPair,
            auth::MessageResponse,
            categories::CategoryRequest,
            categories::CategoryResponse,
            events::EventRequest,
            events::EventResponse,
            events::ImageResponse,
            events::ParticipatedEventResponse,
            events::handlers::ImageUploadForm,
            users::UserResponse,
            users::UpdateUserRequest,
            pagination::PagedCategories,
            pagination::PagedEvents,
            pagination::PagedUsers,
            pagination::PagedParticipations,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session management"),
        (name = "categories", description = "Event categories"),
        (name = "events", description = "Events, images and filtering"),
        (name = "users", description = "Profiles and event participation")
    ),
    info(
        title = "Event Hub API",
        version = "1.0.0",
        description = "RESTful API for publishing events and managing participation"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub category_service: Arc<CategoryService>,
    pub event_service: Arc<EventService>,
    pub user_service: Arc<UserService>,
    pub jwt: JwtCodec,
}

impl FromRef<AppState> for JwtCodec {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl AppState {
    /// Wires the Postgres repositories and local blob storage into the services
    pub fn from_pool(pool: PgPool, config: &AppConfig, passwords: Arc<dyn auth::PasswordService>) -> Self {
        let users = Arc::new(PgUserRepository::new(pool.clone()));
        let tokens = Arc::new(PgRefreshTokenRepository::new(pool.clone()));
        let categories = Arc::new(PgCategoryRepository::new(pool.clone()));
        let events = Arc::new(PgEventRepository::new(pool.clone()));
        let participations = Arc::new(PgParticipationRepository::new(pool));
        let blobs = Arc::new(LocalFileStorage::new(config.storage_base_path.clone()));

        let issuer = TokenIssuer::from_config(&config.tokens, tokens.clone(), users.clone());
        let jwt = issuer.codec().clone();

        Self {
            auth_service: Arc::new(AuthService::new(users.clone(), tokens, passwords, issuer)),
            category_service: Arc::new(CategoryService::new(categories.clone())),
            event_service: Arc::new(EventService::new(events.clone(), categories, blobs)),
            user_service: Arc::new(UserService::new(users, events, participations)),
            jwt,
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState, storage_base_path: &Path) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Room for the multipart framing around a maximum-size image
    let image_body_limit = MAX_IMAGE_BYTES + 1024 * 1024;

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Auth
        .route("/api/auth/register", post(auth_handlers::register_handler))
        .route("/api/auth/login", post(auth_handlers::login_handler))
        .route("/api/auth/refresh", post(auth_handlers::refresh_handler))
        .route("/api/auth/logout", post(auth_handlers::logout_handler))
        .route("/api/auth/logout-all", post(auth_handlers::logout_all_handler))
        // Categories
        .route(
            "/api/categories",
            get(category_handlers::list_categories_handler)
                .post(category_handlers::create_category_handler),
        )
        .route(
            "/api/categories/:id",
            get(category_handlers::get_category_handler)
                .put(category_handlers::update_category_handler)
                .delete(category_handlers::delete_category_handler),
        )
        // Events
        .route(
            "/api/events",
            get(event_handlers::list_events_handler).post(event_handlers::create_event_handler),
        )
        .route(
            "/api/events/:id",
            get(event_handlers::get_event_handler)
                .put(event_handlers::update_event_handler)
                .delete(event_handlers::delete_event_handler),
        )
        .route(
            "/api/events/:id/image",
            post(event_handlers::upload_event_image_handler)
                .delete(event_handlers::delete_event_image_handler)
                .layer(DefaultBodyLimit::max(image_body_limit)),
        )
        // Users
        .route("/api/users", get(user_handlers::list_users_handler))
        .route(
            "/api/users/me",
            get(user_handlers::get_me_handler)
                .put(user_handlers::update_me_handler)
                .delete(user_handlers::delete_me_handler),
        )
        .route("/api/users/me/events", get(user_handlers::my_events_handler))
        .route(
            "/api/users/:id",
            get(user_handlers::get_user_handler)
                .put(user_handlers::update_user_handler)
                .delete(user_handlers::delete_user_handler),
        )
        .route(
            "/api/users/participate/:event_id",
            post(user_handlers::participate_handler)
                .delete(user_handlers::cancel_participation_handler),
        )
        // Uploaded images
        .nest_service("/images", ServeDir::new(storage_base_path))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
