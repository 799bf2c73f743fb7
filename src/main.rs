use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use event_hub::auth::{Argon2PasswordService, PasswordService};
use event_hub::config::AppConfig;
use event_hub::{create_router, db, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber; RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("event_hub=info,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Event Hub API - Starting...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
    db::seed_defaults(&db_pool, passwords.as_ref(), config.admin.as_ref())
        .await
        .expect("Failed to seed roles and administrator");

    tokio::fs::create_dir_all(&config.storage_base_path)
        .await
        .expect("Failed to create storage directory");

    // Create the application router
    let state = AppState::from_pool(db_pool, &config, passwords);
    let app = create_router(state, &config.storage_base_path);

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Event Hub API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
