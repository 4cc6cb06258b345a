use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use super::classify::{classify_response, needs_confirmation, prefer_fallback, ProbeOutcome};
use super::types::{CheckResult, FailureKind};
use crate::config::{Config, ProbeSettings};
use crate::error::{PulseError, Result};
use crate::parked::ParkedDomainDetector;
use crate::validation::parse_target_url;

/// Classifies a single URL as alive, redirect, deprecated or warning
#[derive(Debug, Clone)]
pub struct UrlChecker {
    settings: ProbeSettings,
    detector: ParkedDomainDetector,
}

impl Default for UrlChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlChecker {
    /// Create a new UrlChecker with default settings
    pub fn new() -> Self {
        Self {
            settings: ProbeSettings::default(),
            detector: ParkedDomainDetector::new(),
        }
    }

    /// Create a checker from loaded configuration, including extra parked patterns
    pub fn from_config(config: &Config) -> Result<Self> {
        let detector =
            ParkedDomainDetector::new().with_patterns(config.parked.extra_patterns.clone())?;
        Ok(Self {
            settings: config.probe.clone(),
            detector,
        })
    }

    /// Set the timeout applied to each probe
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    /// Set the maximum number of redirect hops followed
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.settings.max_redirects = max_redirects;
        self
    }

    pub fn with_detector(mut self, detector: ParkedDomainDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    /// Probe a URL and classify the outcome.
    ///
    /// Never fails: transport errors become `deprecated` results carrying an
    /// error message.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn check(&self, url: &str) -> CheckResult {
        let checked_at = Utc::now();
        let start = Instant::now();

        let target = match parse_target_url(url) {
            Ok(target) => target,
            Err(e) => {
                debug!(error = %e, "Rejected URL before probing");
                let detail = match e {
                    PulseError::InvalidUrl(detail) => detail,
                    other => other.to_string(),
                };
                return self.failure(url, FailureKind::InvalidUrl, &detail, start, checked_at);
            }
        };

        // One session per check; sessions are never shared between tasks.
        let client = match self.build_client() {
            Ok(client) => client,
            Err(e) => {
                return self.failure(url, FailureKind::Other, &e.to_string(), start, checked_at)
            }
        };

        match self.probe(&client, target).await {
            Ok(outcome) => {
                let result = classify_response(url, outcome, &self.detector, checked_at);
                debug!(status = %result.status, code = ?result.http_code, "Checked URL");
                result
            }
            Err(e) => {
                let kind = failure_kind(&e);
                debug!(kind = ?kind, error = %e, "Probe failed");
                self.failure(url, kind, &error_chain(&e), start, checked_at)
            }
        }
    }

    fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.settings.user_agent)
                .map_err(|e| PulseError::Config(format!("user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&self.settings.accept)
                .map_err(|e| PulseError::Config(format!("accept header: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(self.timeout())
            .connect_timeout(self.timeout())
            .redirect(reqwest::redirect::Policy::limited(self.settings.max_redirects))
            .default_headers(headers)
            .build()?;
        Ok(client)
    }

    /// HEAD first; confirm doubtful answers with a short GET.
    async fn probe(
        &self,
        client: &Client,
        target: Url,
    ) -> std::result::Result<ProbeOutcome, reqwest::Error> {
        let start = Instant::now();
        let response = client.head(target.clone()).send().await?;
        let primary = ProbeOutcome {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
            elapsed: start.elapsed(),
        };

        if !needs_confirmation(primary.status) {
            return Ok(primary);
        }

        match self.fallback(client, target).await {
            Ok(fallback) if prefer_fallback(primary.status, fallback.status) => {
                debug!(head = primary.status, get = fallback.status, "Using GET fallback");
                Ok(fallback)
            }
            Ok(_) => Ok(primary),
            Err(e) => {
                debug!(error = %e, "GET fallback failed, keeping HEAD result");
                Ok(primary)
            }
        }
    }

    /// GET that reads only a small body prefix to confirm content is served.
    async fn fallback(
        &self,
        client: &Client,
        target: Url,
    ) -> std::result::Result<ProbeOutcome, reqwest::Error> {
        let start = Instant::now();
        let mut response = client.get(target).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut read = 0;
        while read < self.settings.fallback_body_bytes {
            match response.chunk().await? {
                Some(chunk) => read += chunk.len(),
                None => break,
            }
        }

        Ok(ProbeOutcome {
            status,
            final_url,
            elapsed: start.elapsed(),
        })
    }

    fn failure(
        &self,
        url: &str,
        kind: FailureKind,
        detail: &str,
        start: Instant,
        checked_at: chrono::DateTime<Utc>,
    ) -> CheckResult {
        let message = kind.describe(detail, &format_timeout(self.timeout()));
        CheckResult::failed(url, message, start.elapsed().as_millis() as u64, checked_at)
    }
}

/// Sort a transport error into its failure category.
fn failure_kind(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_redirect() {
        FailureKind::TooManyRedirects
    } else if is_tls_error(error) {
        FailureKind::Tls
    } else if error.is_connect() {
        FailureKind::Connection
    } else {
        FailureKind::Other
    }
}

/// TLS failures surface as connect errors; the source chain tells them apart.
fn is_tls_error(error: &reqwest::Error) -> bool {
    use std::error::Error as _;

    // The top-level message embeds the URL, so only the sources are searched.
    let mut source = error.source();
    while let Some(inner) = source {
        let text = inner.to_string().to_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Flatten an error and its sources into one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker() -> UrlChecker {
        UrlChecker::new().with_timeout(Duration::from_secs(5))
    }

    async fn serve(server: &MockServer, verb: &str, route: &str, status: u16) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[test]
    fn test_format_timeout() {
        assert_eq!(format_timeout(Duration::from_secs(10)), "10s");
        assert_eq!(format_timeout(Duration::from_millis(250)), "250ms");
    }

    #[tokio::test]
    async fn test_head_200_is_alive() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/docs", 200).await;

        let url = format!("{}/docs", server.uri());
        let result = checker().check(&url).await;

        assert_eq!(result.status, CheckStatus::Alive);
        assert_eq!(result.http_code, Some(200));
        assert_eq!(result.error, None);
        assert_eq!(result.url, url);
        assert_eq!(result.final_url, url);
    }

    #[tokio::test]
    async fn test_404_and_410_are_deprecated() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/missing", 404).await;
        serve(&server, "HEAD", "/gone", 410).await;

        let missing = checker().check(&format!("{}/missing", server.uri())).await;
        let gone = checker().check(&format!("{}/gone", server.uri())).await;

        assert_eq!(missing.status, CheckStatus::Deprecated);
        assert_eq!(missing.http_code, Some(404));
        assert_eq!(gone.status, CheckStatus::Deprecated);
        assert_eq!(gone.http_code, Some(410));
    }

    #[tokio::test]
    async fn test_403_is_warning_not_deprecated() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/private", 403).await;
        serve(&server, "GET", "/private", 403).await;

        let result = checker().check(&format!("{}/private", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Warning);
        assert_eq!(result.http_code, Some(403));
    }

    #[tokio::test]
    async fn test_401_is_warning() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/auth", 401).await;

        let result = checker().check(&format!("{}/auth", server.uri())).await;
        assert_eq!(result.status, CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_head_405_falls_back_to_get() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/api", 405).await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .expect(1)
            .mount(&server)
            .await;

        let result = checker().check(&format!("{}/api", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Alive);
        assert_eq!(result.http_code, Some(200));
    }

    #[tokio::test]
    async fn test_worse_fallback_keeps_head_result() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/flaky", 400).await;
        serve(&server, "GET", "/flaky", 500).await;

        let result = checker().check(&format!("{}/flaky", server.uri())).await;

        assert_eq!(result.http_code, Some(400));
        assert_eq!(result.status, CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_fallback_past_deadline_keeps_head_result() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/slow-get", 405).await;
        Mock::given(method("GET"))
            .and(path("/slow-get"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(600)))
            .mount(&server)
            .await;

        let checker = UrlChecker::new().with_timeout(Duration::from_millis(200));
        let result = checker.check(&format!("{}/slow-get", server.uri())).await;

        // The GET shares the per-request deadline; its timeout is not a failure.
        assert_eq!(result.http_code, Some(405));
        assert_eq!(result.status, CheckStatus::Warning);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_successful_head_skips_fallback() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/ok", 204).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = checker().check(&format!("{}/ok", server.uri())).await;
        assert_eq!(result.status, CheckStatus::Alive);
    }

    #[tokio::test]
    async fn test_redirect_to_parked_page_is_deprecated() {
        let server = MockServer::start().await;
        let parked = format!("{}/parking/landing", server.uri());
        Mock::given(method("HEAD"))
            .and(path("/old-api"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", parked.as_str()))
            .mount(&server)
            .await;
        serve(&server, "HEAD", "/parking/landing", 200).await;

        let result = checker().check(&format!("{}/old-api", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Deprecated);
        assert_eq!(result.http_code, Some(200));
        assert_eq!(result.final_url, parked);
        assert!(result.error.unwrap().contains(&parked));
    }

    #[tokio::test]
    async fn test_followed_redirect_reports_final_url() {
        let server = MockServer::start().await;
        let target = format!("{}/v2/docs", server.uri());
        Mock::given(method("HEAD"))
            .and(path("/v1/docs"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", target.as_str()))
            .mount(&server)
            .await;
        serve(&server, "HEAD", "/v2/docs", 200).await;

        let result = checker().check(&format!("{}/v1/docs", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Alive);
        assert_eq!(result.final_url, target);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_deprecated() {
        let server = MockServer::start().await;
        let looping = format!("{}/loop", server.uri());
        Mock::given(method("HEAD"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", looping.as_str()))
            .mount(&server)
            .await;

        let result = checker().check(&looping).await;

        assert_eq!(result.status, CheckStatus::Deprecated);
        assert_eq!(result.error.as_deref(), Some("Too many redirects"));
        assert_eq!(result.http_code, None);
    }

    #[tokio::test]
    async fn test_timeout_is_deprecated_with_elapsed_time() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let checker = UrlChecker::new().with_timeout(Duration::from_millis(200));
        let result = checker.check(&format!("{}/slow", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Deprecated);
        let error = result.error.unwrap();
        assert!(error.contains("Timeout"), "unexpected error: {}", error);
        assert!(result.response_time_ms >= 200);
    }

    #[tokio::test]
    async fn test_connection_refused_is_deprecated() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = checker().check(&format!("http://127.0.0.1:{}/", port)).await;

        assert_eq!(result.status, CheckStatus::Deprecated);
        assert!(result.error.unwrap().starts_with("Connection error:"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_deprecated() {
        let result = checker().check("not-a-url").await;

        assert_eq!(result.status, CheckStatus::Deprecated);
        assert!(result.error.unwrap().starts_with("Error: invalid URL"));
        assert_eq!(result.final_url, "not-a-url");
    }

    #[tokio::test]
    async fn test_sends_identifying_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ua"))
            .and(wiremock::matchers::header(
                "user-agent",
                crate::config::DEFAULT_USER_AGENT,
            ))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = checker().check(&format!("{}/ua", server.uri())).await;
        assert_eq!(result.status, CheckStatus::Alive);
    }
}
