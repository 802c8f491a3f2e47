//! MovieBox HTTP client
//!
//! One typed method per upstream endpoint. Browser-shaped default headers
//! and a lazily bootstrapped cookie session; POST endpoints retry
//! transient failures against the primary host, GET endpoints fall back
//! across the mirror set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use backon::Retryable;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN,
    REFERER, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use moviebox_core::config::UpstreamConfig;
use moviebox_core::resilience::{timeout, RetryPolicy};

use crate::classify::{
    classify_failure, html_snippet, text_with_limit, unwrap_envelope, unwrap_envelope_or_raw,
};
use crate::error::MovieBoxError;
use crate::hosts::MirrorHosts;
use crate::session::CookieStore;

const FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";
const X_CLIENT_INFO: &str = r#"{"timezone":"Africa/Nairobi"}"#;

const APP_INFO_PATH: &str = "/wefeed-h5-bff/app/get-latest-app-pkgs";
const HOME_PATH: &str = "/wefeed-h5-bff/web/home";
const SEARCH_PATH: &str = "/wefeed-h5-bff/web/subject/search";
const TRENDING_PATH: &str = "/wefeed-h5-bff/web/subject/trending";
const EVERYONE_SEARCH_PATH: &str = "/wefeed-h5-bff/web/subject/everyone-search";
const SEARCH_SUGGEST_PATH: &str = "/wefeed-h5-bff/web/subject/search-suggest";
const SEARCH_RANK_PATH: &str = "/wefeed-h5-bff/web/subject/search-rank";
const DOWNLOAD_PATH: &str = "/wefeed-h5-bff/web/subject/download";
const PLAY_PATH: &str = "/wefeed-h5-bff/web/subject/play";
const DETAIL_REC_PATH: &str = "/wefeed-h5-bff/web/subject/detail-rec";

/// Shared HTTP client for all upstream requests (connection pooling).
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .timeout(timeout::HTTP_REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build MovieBox shared HTTP client")
});

/// Catalog subject categories, as the upstream encodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectType {
    #[default]
    All = 0,
    Movies = 1,
    TvSeries = 2,
    Music = 6,
}

impl SubjectType {
    #[must_use]
    pub fn as_code(self) -> u32 {
        self as u32
    }

    /// Parse the wire name (`ALL`, `MOVIES`, `TV_SERIES`, `MUSIC`);
    /// unknown names fall back to [`SubjectType::All`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "MOVIES" => Self::Movies,
            "TV_SERIES" => Self::TvSeries,
            "MUSIC" => Self::Music,
            _ => Self::All,
        }
    }
}

/// MovieBox upstream client.
pub struct MovieBoxClient {
    http: Client,
    hosts: MirrorHosts,
    cookies: CookieStore,
    retry: RetryPolicy,
    bootstrapped: AtomicBool,
}

impl MovieBoxClient {
    /// Client over the built-in mirror list (reuses the shared pool).
    #[must_use]
    pub fn new(upstream: &UpstreamConfig) -> Self {
        Self::with_session(
            MirrorHosts::new(upstream.host.as_deref(), &upstream.scheme),
            CookieStore::new(),
        )
    }

    /// Client over an explicit host set.
    #[must_use]
    pub fn with_hosts(hosts: MirrorHosts) -> Self {
        Self::with_session(hosts, CookieStore::new())
    }

    /// Client with an injected cookie store, for callers that share or
    /// inspect the session.
    #[must_use]
    pub fn with_session(hosts: MirrorHosts, cookies: CookieStore) -> Self {
        Self {
            http: SHARED_CLIENT.clone(),
            hosts,
            cookies,
            retry: RetryPolicy::default(),
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Override the retry policy for primary-host requests.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    #[must_use]
    pub fn hosts(&self) -> &MirrorHosts {
        &self.hosts
    }

    /// Default browser-shaped headers plus the session cookie and an
    /// optional caller Referer (caller wins conflicts).
    fn request_headers(
        &self,
        origin: &str,
        referer: Option<&str>,
    ) -> Result<HeaderMap, MovieBoxError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-client-info"),
            HeaderValue::from_static(X_CLIENT_INFO),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(FIREFOX_UA));
        headers.insert(REFERER, HeaderValue::from_str(&self.hosts.base_url())?);
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
        if let Some(cookie) = self.cookies.header() {
            headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
        }
        if let Some(referer) = referer {
            headers.insert(REFERER, HeaderValue::from_str(referer)?);
        }
        Ok(headers)
    }

    /// Lazily bootstrap the cookie session.
    ///
    /// Two concurrent first calls may each fire the app-info request; the
    /// duplicate is harmless since both merge idempotent tokens from the
    /// same upstream session space.
    async fn ensure_session(&self) {
        if self.bootstrapped.load(Ordering::Acquire) {
            return;
        }
        self.fetch_app_info().await;
        self.bootstrapped.store(true, Ordering::Release);
    }

    /// Best-effort app-info call whose only purpose is collecting session
    /// cookies. Every failure is logged and swallowed; the client degrades
    /// to cookie-less requests instead of blocking all functionality.
    async fn fetch_app_info(&self) {
        let url = with_query(
            &self.hosts.absolute_url(APP_INFO_PATH),
            &[("app_name", "moviebox".to_string())],
        );
        let headers = match self.request_headers(&self.hosts.host_base(self.hosts.primary()), None)
        {
            Ok(headers) => headers,
            Err(e) => {
                warn!(error = %e, "session bootstrap skipped: bad headers");
                return;
            }
        };

        match self.http.get(&url).headers(headers).send().await {
            Ok(resp) => {
                self.cookies.absorb(resp.headers());
                let status = resp.status();
                let text = text_with_limit(resp).await;
                if !status.is_success() {
                    warn!(%url, %status, snippet = %html_snippet(&text), "app-info returned non-ok");
                    return;
                }
                match serde_json::from_str::<Value>(&text) {
                    Ok(body) => {
                        if let Err(e) = unwrap_envelope(body) {
                            warn!(%url, error = %e, "app-info envelope rejected");
                        } else {
                            debug!(cookies = !self.cookies.is_empty(), "session bootstrap complete");
                        }
                    }
                    Err(_) => {
                        warn!(%url, snippet = %html_snippet(&text), "app-info returned non-JSON body");
                    }
                }
            }
            Err(e) => warn!(%url, error = %e, "session bootstrap failed"),
        }
    }

    /// POST against the primary host with bounded retry on transient
    /// failures (network errors, upstream 5xx).
    async fn post_api(&self, path: &str, body: &Value) -> Result<Value, MovieBoxError> {
        self.ensure_session().await;
        let url = self.hosts.absolute_url(path);

        let send = || async { self.post_once(&url, body).await };
        let json = send
            .retry(self.retry.backoff())
            .when(MovieBoxError::is_transient)
            .notify(|err, delay| {
                warn!(url = %url, error = %err, backoff = ?delay, "retrying upstream POST");
            })
            .await?;

        unwrap_envelope(json)
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<Value, MovieBoxError> {
        let mut headers =
            self.request_headers(&self.hosts.host_base(self.hosts.primary()), None)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        self.cookies.absorb(resp.headers());

        let status = resp.status();
        let text = text_with_limit(resp).await;
        if !status.is_success() {
            warn!(%url, %status, snippet = %html_snippet(&text), "upstream POST returned non-ok");
            return Err(classify_failure(status, &text));
        }

        serde_json::from_str(&text).map_err(|_| MovieBoxError::Malformed {
            status,
            snippet: html_snippet(&text),
        })
    }

    /// GET with mirror fallback: try every host in resolver order, absorb
    /// cookies from every response (failures included), return the first
    /// 2xx body, otherwise surface the last classified error.
    async fn get_with_cookies(
        &self,
        path_or_url: &str,
        params: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<(StatusCode, String), MovieBoxError> {
        self.ensure_session().await;

        let original = if path_or_url.starts_with('/') {
            self.hosts.absolute_url(path_or_url)
        } else {
            path_or_url.to_string()
        };
        let original = with_query(&original, params);

        let mut last_error: Option<MovieBoxError> = None;
        for host in self.hosts.hosts_to_try() {
            let try_url = self.hosts.rehost(&original, host);
            let headers = self.request_headers(&self.hosts.host_base(host), referer)?;

            match self.http.get(&try_url).headers(headers).send().await {
                Ok(resp) => {
                    self.cookies.absorb(resp.headers());
                    let status = resp.status();
                    let text = text_with_limit(resp).await;
                    if status.is_success() {
                        return Ok((status, text));
                    }
                    warn!(host, url = %try_url, %status, snippet = %html_snippet(&text), "non-ok response from mirror");
                    last_error = Some(classify_failure(status, &text));
                }
                Err(e) => {
                    warn!(host, url = %try_url, error = %e, "request to mirror failed");
                    last_error = Some(MovieBoxError::Network(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MovieBoxError::MirrorsExhausted {
            hosts: self.hosts.hosts_to_try().join(", "),
        }))
    }

    /// Mirror-fallback GET through the envelope-aware parser.
    async fn get_api(
        &self,
        path: &str,
        params: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<Value, MovieBoxError> {
        let (status, text) = self.get_with_cookies(path, params, referer).await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => unwrap_envelope_or_raw(json),
            Err(_) => {
                let snippet = html_snippet(&text);
                warn!(path, %status, %snippet, "upstream returned invalid JSON");
                Err(MovieBoxError::Malformed { status, snippet })
            }
        }
    }

    /// Mirror-fallback GET returning the raw parsed JSON, envelope check
    /// skipped (download/subtitle/stream payloads are not enveloped).
    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<Value, MovieBoxError> {
        let (status, text) = self.get_with_cookies(path, params, referer).await?;
        serde_json::from_str(&text).map_err(|_| {
            let snippet = html_snippet(&text);
            warn!(path, %status, %snippet, "upstream returned invalid JSON");
            MovieBoxError::Malformed { status, snippet }
        })
    }

    fn detail_referer(&self, detail_path: &str) -> String {
        self.hosts.absolute_url(&format!("/movies/{detail_path}"))
    }

    fn media_params(subject_id: &str, season: u32, episode: u32) -> Vec<(&'static str, String)> {
        vec![
            ("subjectId", subject_id.to_string()),
            ("se", season.to_string()),
            ("ep", episode.to_string()),
        ]
    }

    // ------------------------------------------------------------------
    // Upstream endpoints
    // ------------------------------------------------------------------

    /// Homepage content.
    pub async fn get_homepage(&self) -> Result<Value, MovieBoxError> {
        self.get_api(HOME_PATH, &[], None).await
    }

    /// Full-text catalog search.
    pub async fn search(
        &self,
        query: &str,
        subject_type: SubjectType,
        page: u32,
        per_page: u32,
    ) -> Result<Value, MovieBoxError> {
        let body = json!({
            "keyword": query,
            "page": page,
            "perPage": per_page,
            "subjectType": subject_type.as_code(),
        });
        self.post_api(SEARCH_PATH, &body).await
    }

    /// Trending subjects.
    pub async fn get_trending(&self, page: u32, per_page: u32) -> Result<Value, MovieBoxError> {
        let params = vec![("page", page.to_string()), ("perPage", per_page.to_string())];
        self.get_api(TRENDING_PATH, &params, None).await
    }

    /// What everyone else is searching for.
    pub async fn get_popular_searches(&self) -> Result<Value, MovieBoxError> {
        self.get_api(EVERYONE_SEARCH_PATH, &[], None).await
    }

    /// Type-ahead suggestions for a partial query.
    pub async fn get_search_suggestions(
        &self,
        query: &str,
        per_page: u32,
    ) -> Result<Value, MovieBoxError> {
        let body = json!({
            "keyword": query,
            "per_page": per_page,
        });
        self.post_api(SEARCH_SUGGEST_PATH, &body).await
    }

    /// Search-rank list of hot movies and TV series.
    pub async fn get_hot_movies_and_series(&self) -> Result<Value, MovieBoxError> {
        self.get_api(SEARCH_RANK_PATH, &[], None).await
    }

    /// Downloadable files for a subject.
    ///
    /// The upstream serves downloads and subtitles from one physical
    /// endpoint; [`Self::get_subtitles`] parses the same call separately
    /// in case the payloads ever diverge.
    pub async fn get_downloads(
        &self,
        subject_id: &str,
        detail_path: &str,
        season: u32,
        episode: u32,
    ) -> Result<Value, MovieBoxError> {
        let referer = self.detail_referer(detail_path);
        self.get_json(
            DOWNLOAD_PATH,
            &Self::media_params(subject_id, season, episode),
            Some(&referer),
        )
        .await
    }

    /// Subtitle files for a subject.
    pub async fn get_subtitles(
        &self,
        subject_id: &str,
        detail_path: &str,
        season: u32,
        episode: u32,
    ) -> Result<Value, MovieBoxError> {
        let referer = self.detail_referer(detail_path);
        self.get_json(
            DOWNLOAD_PATH,
            &Self::media_params(subject_id, season, episode),
            Some(&referer),
        )
        .await
    }

    /// Streamable sources for a subject.
    pub async fn get_stream(
        &self,
        subject_id: &str,
        detail_path: &str,
        season: u32,
        episode: u32,
    ) -> Result<Value, MovieBoxError> {
        let referer = self.detail_referer(detail_path);
        self.get_json(
            PLAY_PATH,
            &Self::media_params(subject_id, season, episode),
            Some(&referer),
        )
        .await
    }

    /// Human-facing detail page, returned as raw HTML.
    pub async fn get_item_details(&self, detail_path: &str) -> Result<String, MovieBoxError> {
        let url = self.detail_referer(detail_path);
        let (_, text) = self.get_with_cookies(&url, &[], Some(&url)).await?;
        Ok(text)
    }

    /// Recommendations related to a subject.
    pub async fn get_recommendations(
        &self,
        subject_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Value, MovieBoxError> {
        let params = vec![
            ("subjectId", subject_id.to_string()),
            ("page", page.to_string()),
            ("perPage", per_page.to_string()),
        ];
        self.get_api(DETAIL_REC_PATH, &params, None).await
    }
}

/// Append query parameters to an absolute URL. Inputs come from the fixed
/// path table, so a parse failure just returns the URL unchanged.
fn with_query(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    match Url::parse_with_params(url, params.iter().map(|(k, v)| (*k, v.as_str()))) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_type_codes() {
        assert_eq!(SubjectType::All.as_code(), 0);
        assert_eq!(SubjectType::Movies.as_code(), 1);
        assert_eq!(SubjectType::TvSeries.as_code(), 2);
        assert_eq!(SubjectType::Music.as_code(), 6);
    }

    #[test]
    fn test_subject_type_parse() {
        assert_eq!(SubjectType::parse("MOVIES"), SubjectType::Movies);
        assert_eq!(SubjectType::parse("TV_SERIES"), SubjectType::TvSeries);
        assert_eq!(SubjectType::parse("MUSIC"), SubjectType::Music);
        assert_eq!(SubjectType::parse("ALL"), SubjectType::All);
        assert_eq!(SubjectType::parse("garbage"), SubjectType::All);
    }

    #[test]
    fn test_with_query_appends() {
        let url = with_query(
            "https://h5.aoneroom.com/wefeed-h5-bff/web/subject/trending",
            &[("page", "0".to_string()), ("perPage", "18".to_string())],
        );
        assert_eq!(
            url,
            "https://h5.aoneroom.com/wefeed-h5-bff/web/subject/trending?page=0&perPage=18"
        );
    }

    #[test]
    fn test_with_query_empty_params() {
        let url = "https://h5.aoneroom.com/wefeed-h5-bff/web/home";
        assert_eq!(with_query(url, &[]), url);
    }

    #[test]
    fn test_detail_referer() {
        let client = MovieBoxClient::with_hosts(MirrorHosts::default());
        assert_eq!(
            client.detail_referer("some-movie-2024"),
            "https://h5.aoneroom.com/movies/some-movie-2024"
        );
    }
}
