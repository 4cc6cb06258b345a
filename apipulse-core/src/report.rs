//! Run outputs: the JSON audit log and the Markdown summary.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::catalog::write_atomic;
use crate::check::{CheckResult, CheckStatus};
use crate::error::Result;
use crate::merge::{StatusBuckets, UrlIndex, UNKNOWN_NAME};
use crate::validation::sanitize_table_cell;

/// Characters of error text kept in a summary table cell.
const SUMMARY_ERROR_WIDTH: usize = 80;

/// Results ordered by URL, for stable diffs between runs.
pub fn sorted_by_url(results: &[CheckResult]) -> Vec<CheckResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| a.url.cmp(&b.url));
    sorted
}

pub fn render_audit(results: &[CheckResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&sorted_by_url(results))?)
}

pub fn write_audit(path: &Path, results: &[CheckResult]) -> Result<()> {
    write_atomic(path, render_audit(results)?.as_bytes())
}

/// Render the Markdown summary of a run.
///
/// Deprecated and warning URLs are listed once per owning record, sorted by
/// URL. URLs with no owner in the index show as `Unknown` from source `?`.
pub fn render_summary(
    buckets: &StatusBuckets,
    index: &UrlIndex,
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "# API URL Health Check Summary".to_string(),
        String::new(),
        format!("**Checked:** {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        format!("**Total URLs checked:** {}", buckets.total()),
        format!("**Alive:** {}  ", buckets.count(CheckStatus::Alive)),
        format!(
            "**Redirect (alive final):** {}  ",
            buckets.count(CheckStatus::Redirect)
        ),
        format!("**Deprecated:** {}  ", buckets.count(CheckStatus::Deprecated)),
        format!(
            "**Warning (auth/unusual):** {}  ",
            buckets.count(CheckStatus::Warning)
        ),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Deprecated URLs".to_string(),
        String::new(),
        "| API Name | Source | URL | HTTP Code | Error |".to_string(),
        "|----------|--------|-----|-----------|-------|".to_string(),
    ];

    for result in sorted_by_url(&buckets.deprecated) {
        let error = sanitize_table_cell(result.error.as_deref().unwrap_or(""), SUMMARY_ERROR_WIDTH);
        for (name, source) in owner_cells(index, &result.url) {
            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                name,
                source,
                result.url,
                code_cell(&result),
                error
            ));
        }
    }

    lines.extend([
        String::new(),
        "---".to_string(),
        String::new(),
        "## Warning URLs (403/429/Auth Required)".to_string(),
        String::new(),
        "| API Name | Source | URL | HTTP Code |".to_string(),
        "|----------|--------|-----|-----------|".to_string(),
    ]);

    for result in sorted_by_url(&buckets.warning) {
        for (name, source) in owner_cells(index, &result.url) {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                name,
                source,
                result.url,
                code_cell(&result)
            ));
        }
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

pub fn write_summary(
    path: &Path,
    buckets: &StatusBuckets,
    index: &UrlIndex,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    write_atomic(path, render_summary(buckets, index, generated_at).as_bytes())
}

fn owner_cells(index: &UrlIndex, url: &str) -> Vec<(String, String)> {
    let owners = index.owners(url);
    if owners.is_empty() {
        return vec![(UNKNOWN_NAME.to_string(), "?".to_string())];
    }
    owners
        .iter()
        .map(|owner| {
            (
                sanitize_table_cell(&owner.name, usize::MAX),
                owner.source.to_string(),
            )
        })
        .collect()
}

fn code_cell(result: &CheckResult) -> String {
    result
        .http_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
