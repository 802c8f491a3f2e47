//! Relay behavior against a mock CDN.

use axum::http::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_RANGE, RANGE};
use http_body_util::BodyExt;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use moviebox_proxy::{relay_fetch, RelayError, Relayed};

#[tokio::test]
async fn json_upstream_is_buffered() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&cdn)
        .await;

    let url = format!("{}/manifest", cdn.uri());
    let relayed = relay_fetch(&url, &HeaderMap::new()).await.expect("json");

    match relayed {
        Relayed::Json(value) => assert_eq!(value, json!({"ok": true})),
        Relayed::Stream(_) => panic!("JSON should be buffered, not streamed"),
    }
}

#[tokio::test]
async fn range_request_forwards_206_and_content_range() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.mp4"))
        .and(header("Range", "bytes=0-99"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Type", "video/mp4")
                .insert_header("Content-Range", "bytes 0-99/1000")
                .insert_header("Accept-Ranges", "bytes")
                .set_body_bytes(vec![7u8; 100]),
        )
        .mount(&cdn)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert(RANGE, HeaderValue::from_static("bytes=0-99"));

    let url = format!("{}/a.mp4", cdn.uri());
    let relayed = relay_fetch(&url, &inbound).await.expect("stream");

    let response = match relayed {
        Relayed::Stream(response) => response,
        Relayed::Json(_) => panic!("media should stream"),
    };

    assert_eq!(response.status(), 206);
    assert_eq!(
        response.headers().get(CONTENT_RANGE),
        Some(&HeaderValue::from_static("bytes 0-99/1000"))
    );
    assert_eq!(
        response.headers().get(CACHE_CONTROL),
        Some(&HeaderValue::from_static("public, max-age=31536000"))
    );

    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    assert_eq!(body.len(), 100);
    assert!(body.iter().all(|b| *b == 7));
}

#[tokio::test]
async fn redirects_are_followed() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/final", cdn.uri())),
        )
        .mount(&cdn)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/mp4")
                .set_body_bytes(b"abc".to_vec()),
        )
        .mount(&cdn)
        .await;

    let url = format!("{}/moved", cdn.uri());
    let relayed = relay_fetch(&url, &HeaderMap::new()).await.expect("follows");

    match relayed {
        Relayed::Stream(response) => assert_eq!(response.status(), 200),
        Relayed::Json(_) => panic!("media should stream"),
    }
}

#[tokio::test]
async fn upstream_error_is_structured() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&cdn)
        .await;

    let url = format!("{}/gone", cdn.uri());
    let err = relay_fetch(&url, &HeaderMap::new()).await.expect_err("404");

    match &err {
        RelayError::Upstream {
            status,
            status_text,
        } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(status_text, "Not Found");
        }
        RelayError::Network(other) => panic!("unexpected network error: {other}"),
    }
    assert_eq!(err.response_status(), 404);
}

#[tokio::test]
async fn network_failure_reports_500() {
    // nothing is listening on this port
    let err = relay_fetch("http://127.0.0.1:9/nope", &HeaderMap::new())
        .await
        .expect_err("refused");

    assert!(matches!(err, RelayError::Network(_)));
    assert_eq!(err.response_status(), 500);
}

#[tokio::test]
async fn spoofed_browser_headers_are_sent() {
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .and(header("Referer", "https://www.themoviedb.org/"))
        .and(header(
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"allowed": true})))
        .mount(&cdn)
        .await;

    let url = format!("{}/guarded", cdn.uri());
    let relayed = relay_fetch(&url, &HeaderMap::new()).await.expect("allowed");
    assert!(matches!(relayed, Relayed::Json(_)));
}
