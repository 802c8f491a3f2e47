//! Catalog endpoints: search, browse and discovery

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use moviebox_client::SubjectType;

use super::error::AppError;
use super::{upstream_response, AppState};

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    24
}
fn default_subject_type() -> String {
    "ALL".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    query: Option<String>,
    #[serde(default = "default_subject_type")]
    subject_type: String,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

/// POST /api/search
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return AppError::bad_request("Invalid request body").into_response();
    };
    let Some(query) = req.query.filter(|q| !q.is_empty()) else {
        return AppError::bad_request("Query parameter is required").into_response();
    };

    let echo = json!({
        "query": query,
        "subjectType": req.subject_type,
        "page": req.page,
        "perPage": req.per_page,
    });
    let result = state
        .client
        .search(
            &query,
            SubjectType::parse(&req.subject_type),
            req.page,
            req.per_page,
        )
        .await;
    upstream_response("/api/search", &echo, result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingQuery {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_trending_per_page")]
    per_page: u32,
}

fn default_trending_per_page() -> u32 {
    18
}

/// GET /api/trending
pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> Response {
    let echo = json!({"page": params.page, "perPage": params.per_page});
    let result = state.client.get_trending(params.page, params.per_page).await;
    upstream_response("/api/trending", &echo, result)
}

/// GET /api/popular-searches
pub async fn popular_searches(State(state): State<AppState>) -> Response {
    let result = state.client.get_popular_searches().await;
    upstream_response("/api/popular-searches", &json!({}), result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRequest {
    query: Option<String>,
    #[serde(default = "default_suggestions_per_page")]
    per_page: u32,
}

fn default_suggestions_per_page() -> u32 {
    10
}

/// POST /api/search-suggestions
pub async fn search_suggestions(
    State(state): State<AppState>,
    body: Result<Json<SuggestionsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return AppError::bad_request("Invalid request body").into_response();
    };
    let Some(query) = req.query.filter(|q| !q.is_empty()) else {
        return AppError::bad_request("query is required").into_response();
    };

    let echo = json!({"query": query, "perPage": req.per_page});
    let result = state
        .client
        .get_search_suggestions(&query, req.per_page)
        .await;
    upstream_response("/api/search-suggestions", &echo, result)
}

/// GET /api/hot-movies-series
pub async fn hot_movies_series(State(state): State<AppState>) -> Response {
    let result = state.client.get_hot_movies_and_series().await;
    upstream_response("/api/hot-movies-series", &json!({}), result)
}

/// GET /api/homepage
pub async fn homepage(State(state): State<AppState>) -> Response {
    let result = state.client.get_homepage().await;
    upstream_response("/api/homepage", &json!({}), result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsRequest {
    subject_id: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

/// POST /api/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    body: Result<Json<RecommendationsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return AppError::bad_request("Invalid request body").into_response();
    };
    let Some(subject_id) = req.subject_id.filter(|s| !s.is_empty()) else {
        return AppError::bad_request("subjectId is required").into_response();
    };

    let echo = json!({
        "subjectId": subject_id,
        "page": req.page,
        "perPage": req.per_page,
    });
    let result = state
        .client
        .get_recommendations(&subject_id, req.page, req.per_page)
        .await;
    upstream_response("/api/recommendations", &echo, result)
}
