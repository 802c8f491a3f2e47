//! Route handlers and router assembly

pub mod catalog;
pub mod error;
pub mod media;
pub mod proxy;

use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use moviebox_client::{MovieBoxClient, MovieBoxError};

/// Attribution carried on every JSON response.
pub const CREATOR: &str = "God's Zeal";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<MovieBoxClient>,
    /// Public origin of this deployment, for building proxy links.
    pub origin: String,
}

/// Build the gateway router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::RANGE,
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ]);

    Router::new()
        .route("/api/search", post(catalog::search))
        .route("/api/trending", get(catalog::trending))
        .route("/api/popular-searches", get(catalog::popular_searches))
        .route("/api/search-suggestions", post(catalog::search_suggestions))
        .route("/api/hot-movies-series", get(catalog::hot_movies_series))
        .route("/api/homepage", get(catalog::homepage))
        .route("/api/recommendations", post(catalog::recommendations))
        .route("/api/downloads", post(media::downloads))
        .route("/api/subtitles", post(media::subtitles))
        .route("/api/stream", post(media::stream))
        .route("/api/item-details", post(media::item_details))
        .route("/api/proxy", get(proxy::relay))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Base response body: attribution, endpoint echo and the caller's input
/// echoed back.
fn response_base(endpoint: &str, echo: &Value) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("creator".to_string(), json!(CREATOR));
    body.insert("endpoint".to_string(), json!(endpoint));
    if let Value::Object(fields) = echo {
        for (key, value) in fields {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

/// Turn an upstream call result into the endpoint's JSON response:
/// `data` on success, a 502 with the diagnostic `error` string otherwise.
fn upstream_response(
    endpoint: &str,
    echo: &Value,
    result: Result<Value, MovieBoxError>,
) -> Response {
    let mut body = response_base(endpoint, echo);
    match result {
        Ok(data) => {
            body.insert("data".to_string(), data);
            Json(Value::Object(body)).into_response()
        }
        Err(err) => {
            tracing::error!(endpoint, error = %err, "upstream call failed");
            body.insert("error".to_string(), json!(err.to_string()));
            (StatusCode::BAD_GATEWAY, Json(Value::Object(body))).into_response()
        }
    }
}
