use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::truncate_chars;

/// Maximum characters of transport error detail kept in a result.
pub const MAX_ERROR_DETAIL: usize = 200;

/// Liveness verdict for a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// 2xx response
    Alive,
    /// Terminal hop still answered with a redirect code
    Redirect,
    /// Gone, broken, unreachable or parked
    Deprecated,
    /// Reachable but gated (auth, payment, rate limit) or unusual
    Warning,
}

impl CheckStatus {
    pub const ALL: [CheckStatus; 4] = [
        CheckStatus::Alive,
        CheckStatus::Redirect,
        CheckStatus::Deprecated,
        CheckStatus::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Alive => "alive",
            CheckStatus::Redirect => "redirect",
            CheckStatus::Deprecated => "deprecated",
            CheckStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alive" => Ok(CheckStatus::Alive),
            "redirect" => Ok(CheckStatus::Redirect),
            "deprecated" => Ok(CheckStatus::Deprecated),
            "warning" => Ok(CheckStatus::Warning),
            _ => Err(format!("Unknown check status: {}", s)),
        }
    }
}

/// Category of a network-level failure. Every kind classifies as deprecated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Tls,
    Connection,
    Timeout,
    TooManyRedirects,
    InvalidUrl,
    Other,
}

impl FailureKind {
    /// Human-readable error message for this failure.
    ///
    /// `detail` is truncated to [`MAX_ERROR_DETAIL`] characters. Timeouts and
    /// redirect loops carry no detail; the timeout message names `timeout_label`.
    pub fn describe(&self, detail: &str, timeout_label: &str) -> String {
        let detail = truncate_chars(detail, MAX_ERROR_DETAIL);
        match self {
            FailureKind::Tls => format!("SSL error: {}", detail),
            FailureKind::Connection => format!("Connection error: {}", detail),
            FailureKind::Timeout => format!("Timeout ({})", timeout_label),
            FailureKind::TooManyRedirects => "Too many redirects".to_string(),
            FailureKind::InvalidUrl => format!("Error: invalid URL: {}", detail),
            FailureKind::Other => format!("Error: {}", detail),
        }
    }
}

/// Outcome of probing one URL once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// The URL as it appears in the catalogs
    pub url: String,
    pub status: CheckStatus,
    /// HTTP status code of the accepted probe, if any response arrived
    pub http_code: Option<u16>,
    /// URL after following redirects (the input URL when none arrived)
    pub final_url: String,
    /// Wall-clock time of the winning probe
    pub response_time_ms: u64,
    pub error: Option<String>,
    /// When the check started
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    /// Result for a URL that never produced an HTTP response.
    pub fn failed(
        url: &str,
        error: String,
        response_time_ms: u64,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.to_string(),
            status: CheckStatus::Deprecated,
            http_code: None,
            final_url: url.to_string(),
            response_time_ms,
            error: Some(error),
            checked_at,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.status == CheckStatus::Deprecated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CheckStatus::Deprecated).unwrap();
        assert_eq!(json, "\"deprecated\"");
        let parsed: CheckStatus = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, CheckStatus::Warning);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Alive".parse::<CheckStatus>().unwrap(), CheckStatus::Alive);
        assert!("gone".parse::<CheckStatus>().is_err());
    }

    #[test]
    fn test_failure_messages_are_tagged() {
        assert_eq!(
            FailureKind::Tls.describe("bad cert", "10s"),
            "SSL error: bad cert"
        );
        assert_eq!(
            FailureKind::Connection.describe("refused", "10s"),
            "Connection error: refused"
        );
        assert_eq!(FailureKind::Timeout.describe("ignored", "10s"), "Timeout (10s)");
        assert_eq!(
            FailureKind::TooManyRedirects.describe("ignored", "10s"),
            "Too many redirects"
        );
        assert_eq!(FailureKind::Other.describe("boom", "10s"), "Error: boom");
    }

    #[test]
    fn test_failure_detail_is_truncated() {
        let detail = "x".repeat(500);
        let message = FailureKind::Connection.describe(&detail, "10s");
        assert_eq!(message.len(), "Connection error: ".len() + MAX_ERROR_DETAIL);
    }

    #[test]
    fn test_failed_result_is_deprecated() {
        let result = CheckResult::failed("https://gone.example", "Error: x".into(), 12, Utc::now());
        assert!(result.is_deprecated());
        assert_eq!(result.http_code, None);
        assert_eq!(result.final_url, "https://gone.example");
        assert_eq!(result.response_time_ms, 12);
    }

    #[test]
    fn test_result_json_shape() {
        let result = CheckResult::failed("https://a.example", "Too many redirects".into(), 5, Utc::now());
        let value = serde_json::to_value(&result).unwrap();
        for key in [
            "url",
            "status",
            "http_code",
            "final_url",
            "response_time_ms",
            "error",
            "checked_at",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["status"], "deprecated");
        assert!(value["http_code"].is_null());
    }
}
