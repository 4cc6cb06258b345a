use super::OutputFormatter;
use crate::check::CheckResult;
use crate::pipeline::RunOutcome;
use crate::report::sorted_by_url;

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_result(&self, result: &CheckResult) -> String {
        self.to_json(result)
    }

    fn format_results(&self, results: &[CheckResult]) -> String {
        self.to_json(&sorted_by_url(results))
    }

    fn format_outcome(&self, outcome: &RunOutcome) -> String {
        self.to_json(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use chrono::Utc;

    #[test]
    fn test_compact_result_is_single_line() {
        let result = CheckResult::failed("https://x.example", "Too many redirects".into(), 3, Utc::now());
        let json = JsonFormatter::new().compact().format_result(&result);
        assert!(!json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], CheckStatus::Deprecated.as_str());
    }
}
