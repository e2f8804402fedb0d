mod adapters;
mod application;
mod domain;
mod services;

use std::sync::Arc;

use adapters::{
    controllers::{blob_controller::BlobController, health_controller::HealthController},
    state::AppState,
};
use application::services::{BlobService, BlobWorkflows, LoggingBlobService};
use axum::{
    routing::{get, post},
    Router,
};
use domain::config::AppConfig;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize AWS SDK crypto provider (required for aws-sdk-s3)
    // This must be called before any AWS SDK operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = AppConfig::from_env();
    tracing::info!(
        provider = ?config.provider,
        container = %config.bucket,
        "Starting blob-gallery"
    );

    // Configure CORS
    let cors = if let Ok(allowed_origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
        // Parse comma-separated origins
        let origins: Vec<_> = allowed_origins
            .split(',')
            .map(|s| s.trim().parse().expect("Invalid CORS origin"))
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow all origins if not specified (only for development)
        CorsLayer::permissive()
    };

    let repository = services::create_blob_repository(&config).await;
    let workflows = Arc::new(BlobWorkflows::new(repository)) as Arc<dyn BlobService>;
    let blob_service = Arc::new(LoggingBlobService::new(workflows)) as Arc<dyn BlobService>;

    let app_state = AppState {
        blob_service,
        provider: config.provider,
        container: config.bucket.clone(),
    };

    let router = Router::new()
        .route("/", get(BlobController::list_files))
        .route("/upload", post(BlobController::upload_file))
        .route("/download/{file_name}", get(BlobController::download_file))
        .route("/delete/{file_name}", post(BlobController::delete_file))
        .route(
            "/generate-thumbnail/{file_name}",
            get(BlobController::generate_thumbnail),
        )
        .route("/show/{file_name}", get(BlobController::show_image))
        .route("/edit", post(BlobController::rename_file))
        .route("/edit-description", post(BlobController::edit_description))
        .route(
            "/toggle-display-mode",
            post(BlobController::toggle_display_mode),
        )
        .route("/health", get(HealthController::health_check))
        .layer(cors)
        .with_state(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", config.port);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}
