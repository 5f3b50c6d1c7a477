mod api;
mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use storage::Storage;

/// Phone photos routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
fn build_app(storage: Arc<Storage>, dist_dir: &Path) -> Router {
    let static_files = Router::new()
        .nest(
            "/static",
            cached_static_router(&dist_dir.join("static"), CACHE_1DAY),
        )
        .nest(
            "/assets",
            cached_static_router(&dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    let index = dist_dir.join("index.html");
    Router::new()
        .route(
            "/dangers",
            get(api::list_dangers).post(api::submit_danger),
        )
        .route("/", get(move || serve_index(index.clone())))
        .with_state(storage)
        .merge(static_files)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = PathBuf::from(
        std::env::var("DB_PATH").unwrap_or_else(|_| "data/hazards.redb".to_string()),
    );
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create database directory");
    }
    let storage = Storage::open(&db_path);
    match storage.count_hazards() {
        Ok(count) => tracing::info!(db = %db_path.display(), hazards = count, "Opened hazard store"),
        Err(e) => tracing::warn!(db = %db_path.display(), error = %e, "Could not count hazards"),
    }

    let dist_dir =
        PathBuf::from(std::env::var("DIST_DIR").unwrap_or_else(|_| "dist".to_string()));
    let app = build_app(storage, &dist_dir);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));
    axum::serve(listener, app).await.expect("Server error");
}

async fn serve_index(index: PathBuf) -> Html<String> {
    // Try to serve the built frontend, fall back to a simple message
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Asphalt Alert</title></head>
<body>
<h1>Asphalt Alert</h1>
<p>Frontend not built yet. The hazard feed is at <code>/dangers?north=&amp;south=&amp;east=&amp;west=</code>.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}
