//! Geo-bypass relay endpoint

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use moviebox_proxy::{relay_fetch, RelayError, Relayed};

use super::error::AppError;
use super::CREATOR;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

/// GET /api/proxy?url=...
pub async fn relay(Query(params): Query<ProxyQuery>, headers: HeaderMap) -> Response {
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return AppError::bad_request("URL parameter is required").into_response();
    };

    match relay_fetch(&url, &headers).await {
        Ok(Relayed::Json(data)) => Json(json!({
            "success": true,
            "data": data,
            "creator": CREATOR,
        }))
        .into_response(),
        Ok(Relayed::Stream(response)) => response.into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.response_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = match &err {
                RelayError::Upstream {
                    status,
                    status_text,
                } => json!({
                    "error": "Failed to fetch resource",
                    "status": status.as_u16(),
                    "statusText": status_text,
                    "creator": CREATOR,
                }),
                RelayError::Network(message) => json!({
                    "error": message,
                    "creator": CREATOR,
                }),
            };
            (status, Json(body)).into_response()
        }
    }
}
