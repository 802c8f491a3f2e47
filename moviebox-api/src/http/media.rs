//! Media endpoints: downloads, subtitles, streams and detail pages

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use moviebox_proxy::rewrite_urls;

use super::error::AppError;
use super::{upstream_response, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    subject_id: Option<String>,
    detail_path: Option<String>,
    #[serde(default)]
    season: u32,
    #[serde(default)]
    episode: u32,
    quality: Option<String>,
    language: Option<String>,
}

impl MediaRequest {
    /// Both identifiers are required before any upstream call.
    fn require_subject(self) -> Result<(String, String, Self), AppError> {
        match (
            self.subject_id.clone().filter(|s| !s.is_empty()),
            self.detail_path.clone().filter(|s| !s.is_empty()),
        ) {
            (Some(subject_id), Some(detail_path)) => Ok((subject_id, detail_path, self)),
            _ => Err(AppError::bad_request(
                "subjectId and detailPath are required",
            )),
        }
    }
}

fn parse_body(body: Result<Json<MediaRequest>, JsonRejection>) -> Result<MediaRequest, AppError> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(_) => Err(AppError::bad_request("Invalid request body")),
    }
}

/// POST /api/downloads
pub async fn downloads(
    State(state): State<AppState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> Response {
    let (subject_id, detail_path, req) = match parse_body(body).and_then(MediaRequest::require_subject) {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    let echo = json!({
        "subjectId": subject_id,
        "detailPath": detail_path,
        "season": req.season,
        "episode": req.episode,
    });
    let result = state
        .client
        .get_downloads(&subject_id, &detail_path, req.season, req.episode)
        .await;
    upstream_response("/api/downloads", &echo, result)
}

/// POST /api/subtitles
pub async fn subtitles(
    State(state): State<AppState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> Response {
    let (subject_id, detail_path, req) = match parse_body(body).and_then(MediaRequest::require_subject) {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    let echo = json!({
        "subjectId": subject_id,
        "detailPath": detail_path,
        "requestedLanguage": req.language.as_deref().unwrap_or("en"),
        "season": req.season,
        "episode": req.episode,
    });
    let result = state
        .client
        .get_subtitles(&subject_id, &detail_path, req.season, req.episode)
        .await;
    upstream_response("/api/subtitles", &echo, result)
}

/// POST /api/stream
///
/// Stream payloads carry direct CDN links; they are rewritten into
/// same-origin proxy links before reaching the browser.
pub async fn stream(
    State(state): State<AppState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> Response {
    let (subject_id, detail_path, req) = match parse_body(body).and_then(MediaRequest::require_subject) {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    let echo = json!({
        "subjectId": subject_id,
        "detailPath": detail_path,
        "requestedQuality": req.quality.as_deref().unwrap_or("best"),
        "season": req.season,
        "episode": req.episode,
    });
    let result = state
        .client
        .get_stream(&subject_id, &detail_path, req.season, req.episode)
        .await
        .map(|data| rewrite_urls(&data, &state.origin));
    upstream_response("/api/stream", &echo, result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetailsRequest {
    detail_path: Option<String>,
}

/// POST /api/item-details
///
/// The payload is the raw upstream detail page (HTML), not JSON.
pub async fn item_details(
    State(state): State<AppState>,
    body: Result<Json<ItemDetailsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return AppError::bad_request("Invalid request body").into_response();
    };
    let Some(detail_path) = req.detail_path.filter(|s| !s.is_empty()) else {
        return AppError::bad_request("detailPath is required").into_response();
    };

    let echo = json!({"detailPath": detail_path});
    let result = state
        .client
        .get_item_details(&detail_path)
        .await
        .map(Value::String);
    upstream_response("/api/item-details", &echo, result)
}
