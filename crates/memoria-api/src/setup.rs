//! Application wiring: logging, database, object store, routes, server.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

use memoria_core::Config;
use memoria_db::MemorialRepository;
use memoria_processing::PreparePolicy;
use memoria_storage::{S3Broker, UploadBroker};
use memoria_sync::SyncCoordinator;

use crate::api_doc::ApiDoc;
use crate::handlers::{health, memorials, uploads};
use crate::state::AppState;

/// Upsert bodies carry base64 image data; allow several photos per save.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("../memoria-db/migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    let broker: Arc<dyn UploadBroker> = Arc::new(
        S3Broker::new(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint_url.clone(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize object store: {}", e))?,
    );

    let repository = MemorialRepository::new(db_pool.clone());
    let coordinator = SyncCoordinator::new(
        broker.clone(),
        Arc::new(repository.clone()),
        PreparePolicy::with_max_bytes(config.max_asset_bytes),
    );

    let state = Arc::new(AppState {
        db_pool,
        config,
        repository,
        broker,
        coordinator,
    });

    let router = build_router(state.clone());
    Ok((state, router))
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/memorials",
            get(memorials::list_memorials).post(memorials::create_memorial),
        )
        .route(
            "/api/memorials/{id}",
            get(memorials::get_memorial)
                .put(memorials::update_memorial)
                .delete(memorials::delete_memorial),
        )
        .route(
            "/api/recuerdos/{slug}",
            get(memorials::get_memorial_by_slug),
        )
        .route("/api/uploads", post(uploads::authorize_upload))
        .route("/api/uploads/{*key}", delete(uploads::remove_upload))
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn start_server(config: &Config, router: Router) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "memoria-api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutdown signal received");
}
