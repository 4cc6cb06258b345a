//! Target URL validation and text helpers

use reqwest::Url;

use crate::error::{PulseError, Result};

/// Parse and validate a catalog URL before probing it
///
/// This function:
/// - Trims surrounding whitespace
/// - Requires an absolute URL with an `http` or `https` scheme
/// - Requires a host
/// - Does NOT rewrite the URL otherwise (catalog URLs are probed as written)
pub fn parse_target_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(PulseError::InvalidUrl("empty URL".to_string()));
    }

    let parsed =
        Url::parse(trimmed).map_err(|e| PulseError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PulseError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                trimmed, other
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(PulseError::InvalidUrl(format!("{}: missing host", trimmed)));
    }

    Ok(parsed)
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Make free text safe for a single Markdown table cell.
pub fn sanitize_table_cell(text: &str, max: usize) -> String {
    let cleaned = text.replace('|', "/").replace(['\n', '\r'], " ");
    truncate_chars(&cleaned, max).to_string()
}
