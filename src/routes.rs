//! Router assembly: generic dispatch routes, health/version, CORS.

use crate::config::CorsConfig;
use crate::handlers::{
    delete_arg, delete_root, get_arg, get_root, post_arg, post_root, put_arg, put_root,
};
use crate::state::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Generic dispatch routes. The second segment is the operation token, the
/// optional third is the custom pattern for `own` or the id for
/// update/delete.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:model/:op",
            get(get_root)
                .post(post_root)
                .put(put_root)
                .delete(delete_root),
        )
        .route(
            "/:model/:op/:arg",
            get(get_arg).post(post_arg).put(put_arg).delete(delete_arg),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.allowed_origins.is_empty() {
        // Credentials cannot be combined with a wildcard origin.
        return layer.allow_origin(AllowOrigin::any());
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(config.allow_credentials)
}
