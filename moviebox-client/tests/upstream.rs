//! Integration tests against mock upstream mirrors.

use serde_json::json;
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use moviebox_client::{MirrorHosts, MovieBoxClient, SubjectType};
use moviebox_core::resilience::RetryPolicy;

const TRENDING: &str = "/wefeed-h5-bff/web/subject/trending";
const SEARCH: &str = "/wefeed-h5-bff/web/subject/search";
const DOWNLOAD: &str = "/wefeed-h5-bff/web/subject/download";

fn host_of(server: &MockServer) -> String {
    format!("127.0.0.1:{}", server.address().port())
}

fn ok_envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 0,
        "message": "ok",
        "data": data,
    }))
}

fn client_for(primary: &MockServer, mirrors: &[&MockServer]) -> MovieBoxClient {
    let hosts = MirrorHosts::with_mirrors(
        &host_of(primary),
        mirrors.iter().map(|s| host_of(s)).collect(),
        "http",
    );
    MovieBoxClient::with_hosts(hosts).with_retry(RetryPolicy::fast(4))
}

#[tokio::test]
async fn falls_back_to_next_mirror_on_primary_failure() {
    let primary = MockServer::start().await;
    let mirror = MockServer::start().await;

    // primary is down for everything, including the session bootstrap
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path(TRENDING))
        .respond_with(ok_envelope(json!({"items": []})))
        .mount(&mirror)
        .await;

    let client = client_for(&primary, &[&mirror]);
    let data = client.get_trending(0, 18).await.expect("mirror succeeds");

    assert_eq!(data, json!({"items": []}));
    let mirror_hits = mirror.received_requests().await.expect("recording on");
    assert_eq!(mirror_hits.len(), 1);
}

#[tokio::test]
async fn cookies_from_failed_responses_are_sent_to_later_hosts() {
    let primary = MockServer::start().await;
    let mirror = MockServer::start().await;

    // failure responses still set session cookies
    Mock::given(any())
        .respond_with(
            ResponseTemplate::new(500).insert_header("Set-Cookie", "account=abc123; Path=/"),
        )
        .mount(&primary)
        .await;
    // the mirror only answers when the captured cookie comes back
    Mock::given(method("GET"))
        .and(path(TRENDING))
        .and(header("Cookie", "account=abc123"))
        .respond_with(ok_envelope(json!({"items": [1, 2]})))
        .mount(&mirror)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&mirror)
        .await;

    let client = client_for(&primary, &[&mirror]);
    let data = client.get_trending(0, 18).await.expect("cookie forwarded");

    assert_eq!(data, json!({"items": [1, 2]}));
    assert_eq!(client.cookies().get("account").as_deref(), Some("abc123"));
}

#[tokio::test]
async fn captcha_page_with_200_surfaces_title_snippet() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Verify you are human</title></head><body>captcha</body></html>",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    let err = client.get_trending(0, 18).await.expect_err("html body");

    assert!(err.to_string().contains("Verify you are human"));
}

#[tokio::test]
async fn envelope_error_carries_upstream_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TRENDING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 40001,
            "message": "subject not found",
            "data": null,
        })))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ok_envelope(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    let err = client.get_trending(0, 18).await.expect_err("logical error");

    assert!(err.to_string().contains("subject not found"));
}

#[tokio::test]
async fn search_retries_transient_failures_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(ok_envelope(json!({"results": ["dune"]})))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ok_envelope(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    let data = client
        .search("dune", SubjectType::All, 1, 24)
        .await
        .expect("succeeds after retries");

    assert_eq!(data, json!({"results": ["dune"]}));
}

#[tokio::test]
async fn search_does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ok_envelope(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    let err = client
        .search("dune", SubjectType::Movies, 1, 24)
        .await
        .expect_err("403 is not transient");

    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn all_mirrors_failing_reports_last_status() {
    let primary = MockServer::start().await;
    let mirror = MockServer::start().await;

    for server in [&primary, &mirror] {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .mount(server)
            .await;
    }

    let client = client_for(&primary, &[&mirror]);
    let err = client.get_trending(0, 18).await.expect_err("all down");

    assert!(err.to_string().contains("503"));

    // both mirrors were attempted for the trending call
    for server in [&primary, &mirror] {
        let hits = server.received_requests().await.expect("recording on");
        assert!(hits.iter().any(|r| r.url.path() == TRENDING));
    }
}

#[tokio::test]
async fn downloads_pin_referer_and_skip_envelope_check() {
    let server = MockServer::start().await;
    let referer = format!("http://{}/movies/some-movie-2024", host_of(&server));

    // a body with code/message keys comes back whole: no envelope unwrap
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(header("Referer", referer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 99,
            "message": "ignored",
            "downloads": [{"url": "https://cdn.example/a.mp4"}],
        })))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ok_envelope(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    let data = client
        .get_downloads("12345", "some-movie-2024", 0, 0)
        .await
        .expect("raw payload");

    assert_eq!(data["code"], json!(99));
    assert_eq!(data["downloads"][0]["url"], json!("https://cdn.example/a.mp4"));
}

#[tokio::test]
async fn trending_sends_page_params_and_default_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TRENDING))
        .and(wiremock::matchers::query_param("page", "2"))
        .and(wiremock::matchers::query_param("perPage", "18"))
        .and(header("Accept", "application/json, text/plain, */*"))
        .respond_with(ok_envelope(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ok_envelope(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server, &[]);
    client.get_trending(2, 18).await.expect("params forwarded");
}
