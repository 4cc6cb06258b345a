use super::OutputFormatter;
use crate::check::{CheckResult, CheckStatus};
use crate::colors::{paint_status, PaletteExt};
use crate::merge::{MergeStats, StatusBuckets};
use crate::pipeline::RunOutcome;
use crate::report::sorted_by_url;

fn format_elapsed(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{}ms", ms);
    }
    let total_secs = ms / 1_000;
    if total_secs < 60 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else if total_secs < 3600 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h {}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}

fn status_symbol(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Alive => "✓",
        CheckStatus::Redirect => "→",
        CheckStatus::Warning => "!",
        CheckStatus::Deprecated => "✗",
    }
}

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.label().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.muted().to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&self, text: &str, status: CheckStatus) -> String {
        if self.use_colors {
            paint_status(text, status).to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        let width = text.chars().count();
        if self.use_colors {
            format!("\n{}\n{}", text.accent(), "─".repeat(width).muted())
        } else {
            format!("\n{}\n{}", text, "-".repeat(width))
        }
    }

    fn result_line(&self, result: &CheckResult) -> String {
        let verdict = format!("{} {:<10}", status_symbol(result.status), result.status);
        let code = result
            .http_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "---".to_string());

        let mut line = format!(
            "  {} {} {} {}",
            self.status(&verdict, result.status),
            code,
            result.url,
            self.muted(&format!("({})", format_elapsed(result.response_time_ms)))
        );
        if result.final_url != result.url {
            line.push_str(&format!("\n      {} {}", self.muted("→"), result.final_url));
        }
        if let Some(ref error) = result.error {
            line.push_str(&format!("\n      {}", self.muted(error)));
        }
        line
    }

    fn merge_line(&self, name: &str, stats: &MergeStats) -> String {
        format!(
            "  {}: {} deprecated ({} new), {} cleared",
            self.label(name),
            stats.marked,
            stats.newly_marked,
            stats.cleared
        )
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_result(&self, result: &CheckResult) -> String {
        let mut output = vec![self.header(&format!("Check: {}", result.url))];

        output.push(format!(
            "  {}: {}",
            self.label("Status"),
            self.status(
                &format!("{} {}", status_symbol(result.status), result.status),
                result.status
            )
        ));
        if let Some(code) = result.http_code {
            output.push(format!("  {}: {}", self.label("HTTP Code"), code));
        }
        if result.final_url != result.url {
            output.push(format!("  {}: {}", self.label("Final URL"), result.final_url));
        }
        if let Some(ref error) = result.error {
            output.push(format!("  {}: {}", self.label("Error"), error));
        }
        output.push(format!(
            "  {}: {}",
            self.label("Response Time"),
            format_elapsed(result.response_time_ms)
        ));
        output.push(format!(
            "  {}: {}",
            self.label("Checked"),
            self.muted(&result.checked_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        ));

        output.join("\n")
    }

    fn format_results(&self, results: &[CheckResult]) -> String {
        let buckets = StatusBuckets::from_results(results);
        let mut output = vec![self.header(&format!("Checked {} URLs", results.len()))];

        let counts: Vec<String> = CheckStatus::ALL
            .iter()
            .map(|s| self.status(&format!("{} {}", buckets.count(*s), s), *s))
            .collect();
        output.push(format!("  {}", counts.join("  ")));
        output.push(String::new());

        for result in sorted_by_url(results) {
            output.push(self.result_line(&result));
        }

        output.join("\n")
    }

    fn format_outcome(&self, outcome: &RunOutcome) -> String {
        let title = if outcome.dry_run {
            "Health Check (dry run)"
        } else {
            "Health Check"
        };
        let mut output = vec![self.header(title)];

        output.push(format!(
            "  {}: {}",
            self.label("URLs Checked"),
            outcome.total_urls
        ));
        for (status, count) in [
            (CheckStatus::Alive, outcome.alive),
            (CheckStatus::Redirect, outcome.redirect),
            (CheckStatus::Deprecated, outcome.deprecated),
            (CheckStatus::Warning, outcome.warning),
        ] {
            output.push(format!(
                "    {} {}",
                self.status(&format!("{:<10}", status), status),
                count
            ));
        }

        output.push(self.header("Catalogs"));
        output.push(self.merge_line("raw", &outcome.raw));
        output.push(self.merge_line("zapier", &outcome.zapier));
        if outcome.dry_run {
            output.push(format!("  {}", self.muted("Catalog files were not modified")));
        }

        output.push(String::new());
        output.push(format!(
            "  {}: {}",
            self.label("Elapsed"),
            format_elapsed(outcome.elapsed_ms)
        ));

        output.join("\n")
    }
}
