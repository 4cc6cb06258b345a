use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::{CheckResult, CheckStatus};
use crate::parked::ParkedDomainDetector;

/// Response accepted from the HEAD probe or its GET fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub final_url: String,
    pub elapsed: Duration,
}

/// HEAD answers that must be confirmed with a GET before being trusted.
///
/// Plenty of servers reject or mishandle HEAD while serving GET fine.
pub fn needs_confirmation(status: u16) -> bool {
    matches!(status, 400 | 403 | 405 | 501) || status >= 500
}

/// Whether the GET fallback should replace the original HEAD answer.
pub fn prefer_fallback(original: u16, fallback: u16) -> bool {
    fallback < original || matches!(original, 405 | 501)
}

/// Map an accepted HTTP status code to a verdict.
pub fn classify_status(code: u16) -> CheckStatus {
    match code {
        200..=299 => CheckStatus::Alive,
        301 | 302 | 303 | 307 | 308 => CheckStatus::Redirect,
        403 | 429 => CheckStatus::Warning,
        404 | 410 => CheckStatus::Deprecated,
        500..=u16::MAX => CheckStatus::Deprecated,
        401 | 402 => CheckStatus::Warning,
        _ => CheckStatus::Warning,
    }
}

/// Build the result for a URL that produced an HTTP response.
///
/// A parked final URL wins over any status code.
pub fn classify_response(
    url: &str,
    outcome: ProbeOutcome,
    detector: &ParkedDomainDetector,
    checked_at: DateTime<Utc>,
) -> CheckResult {
    let (status, error) = if detector.is_parked(&outcome.final_url) {
        (
            CheckStatus::Deprecated,
            Some(format!(
                "Redirects to parked/domain-sale page: {}",
                outcome.final_url
            )),
        )
    } else {
        (classify_status(outcome.status), None)
    };

    CheckResult {
        url: url.to_string(),
        status,
        http_code: Some(outcome.status),
        final_url: outcome.final_url,
        response_time_ms: outcome.elapsed.as_millis() as u64,
        error,
        checked_at,
    }
}
