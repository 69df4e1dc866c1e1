use crate::common::constants::get_supported_sources;
use crate::common::error::ScraperError;
use crate::observability::metrics;
use crate::pipeline::orchestrator::{status_code, ErrorEnvelope, Orchestrator, RunMode};
use axum::{
    extract::rejection::JsonRejection,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "book-scraper",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": get_supported_sources()
    }))
}

async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render().unwrap_or_default(),
    )
}

fn error_response(error: &ScraperError) -> Response {
    let status = StatusCode::from_u16(status_code(error)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorEnvelope::from_error(error))).into_response()
}

fn request_url(body: Result<Json<ScrapeRequest>, JsonRejection>) -> Result<String, ScraperError> {
    body.map(|Json(request)| request.url)
        .map_err(|rejection| ScraperError::InvalidInput(rejection.body_text()))
}

/// Preview: extract and normalize without touching the catalog
async fn scrape(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let url = match request_url(body) {
        Ok(url) => url,
        Err(e) => return error_response(&e),
    };
    match orchestrator.run(&url, RunMode::Preview).await {
        Ok(outcome) => Json(outcome.fields).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Persist: extract, normalize and reconcile names against the catalog
async fn import(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let url = match request_url(body) {
        Ok(url) => url,
        Err(e) => return error_response(&e),
    };
    match orchestrator.run(&url, RunMode::Persist).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Create the HTTP router with all routes
pub fn create_server(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .route("/scrape", post(scrape))
        .route("/import", post(import))
        .layer(Extension(orchestrator))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(orchestrator: Arc<Orchestrator>, port: u16) -> anyhow::Result<()> {
    let app = create_server(orchestrator);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Health check: http://localhost:{port}/health");
    info!("Preview a book: POST http://localhost:{port}/scrape {{\"url\": \"...\"}}");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
