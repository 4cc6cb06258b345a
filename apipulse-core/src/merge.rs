//! Folding check results back into the catalogs.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogSource, Catalogs, DEPRECATED};
use crate::check::{CheckResult, CheckStatus};

/// Name used in reports for records that lack one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A catalog record referencing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub name: String,
    pub source: CatalogSource,
}

/// Reverse index from URL to every record that references it.
///
/// Built before any check runs so a URL shared by several records (in one
/// catalog or across both) is probed once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlIndex {
    entries: IndexMap<String, Vec<RecordRef>>,
}

impl UrlIndex {
    pub fn build(catalogs: &Catalogs) -> Self {
        let mut entries: IndexMap<String, Vec<RecordRef>> = IndexMap::new();
        for (source, record) in catalogs.records() {
            let Some(url) = record.url() else {
                continue;
            };
            entries.entry(url.to_string()).or_default().push(RecordRef {
                name: record.name().unwrap_or(UNKNOWN_NAME).to_string(),
                source,
            });
        }

        debug!(urls = entries.len(), "Built URL index");
        Self { entries }
    }

    /// Distinct URLs in first-seen order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn owners(&self, url: &str) -> &[RecordRef] {
        self.entries.get(url).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Results partitioned by verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBuckets {
    pub alive: Vec<CheckResult>,
    pub redirect: Vec<CheckResult>,
    pub deprecated: Vec<CheckResult>,
    pub warning: Vec<CheckResult>,
}

impl StatusBuckets {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut buckets = Self::default();
        for result in results {
            let bucket = match result.status {
                CheckStatus::Alive => &mut buckets.alive,
                CheckStatus::Redirect => &mut buckets.redirect,
                CheckStatus::Deprecated => &mut buckets.deprecated,
                CheckStatus::Warning => &mut buckets.warning,
            };
            bucket.push(result.clone());
        }
        buckets
    }

    pub fn get(&self, status: CheckStatus) -> &[CheckResult] {
        match status {
            CheckStatus::Alive => &self.alive,
            CheckStatus::Redirect => &self.redirect,
            CheckStatus::Deprecated => &self.deprecated,
            CheckStatus::Warning => &self.warning,
        }
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.get(status).len()
    }

    pub fn total(&self) -> usize {
        CheckStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

/// What to do with an existing `deprecated` mark whose URL was not checked
/// in the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Keep the mark; only a fresh non-deprecated verdict clears it.
    #[default]
    PreserveUnchecked,
    /// Clear the mark whenever the URL is not deprecated in this run,
    /// including when it was not checked at all or the record has no URL.
    ClearUnchecked,
}

/// Per-catalog counts of status changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Records carrying `status = "deprecated"` after this run's verdicts
    pub marked: usize,
    /// Of `marked`, records that were not deprecated before
    pub newly_marked: usize,
    /// Stale deprecation marks removed
    pub cleared: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub catalogs: Catalogs,
    pub raw: MergeStats,
    pub zapier: MergeStats,
}

impl MergeOutcome {
    pub fn stats(&self, source: CatalogSource) -> MergeStats {
        match source {
            CatalogSource::Raw => self.raw,
            CatalogSource::Zapier => self.zapier,
        }
    }
}

/// Merge with the default [`StalePolicy::PreserveUnchecked`].
pub fn merge(catalogs: &Catalogs, results: &[CheckResult]) -> MergeOutcome {
    merge_with(catalogs, results, StalePolicy::default())
}

/// Produce new catalogs with this run's verdicts applied.
///
/// The input catalogs are not modified. Records without a URL count as
/// unchecked.
pub fn merge_with(
    catalogs: &Catalogs,
    results: &[CheckResult],
    policy: StalePolicy,
) -> MergeOutcome {
    let verdicts: HashMap<&str, CheckStatus> = results
        .iter()
        .map(|r| (r.url.as_str(), r.status))
        .collect();

    let mut updated = catalogs.clone();
    let mut raw = MergeStats::default();
    let mut zapier = MergeStats::default();

    for (source, record) in updated.records_mut() {
        let stats = match source {
            CatalogSource::Raw => &mut raw,
            CatalogSource::Zapier => &mut zapier,
        };

        let verdict = record.url().and_then(|url| verdicts.get(url).copied());

        match verdict {
            Some(CheckStatus::Deprecated) => {
                if !record.is_deprecated() {
                    stats.newly_marked += 1;
                }
                record.set_status(DEPRECATED);
                stats.marked += 1;
            }
            Some(_) if record.is_deprecated() => {
                record.clear_status();
                stats.cleared += 1;
            }
            None if record.is_deprecated() && policy == StalePolicy::ClearUnchecked => {
                record.clear_status();
                stats.cleared += 1;
            }
            _ => {}
        }
    }

    debug!(?raw, ?zapier, ?policy, "Merged check results");

    MergeOutcome {
        catalogs: updated,
        raw,
        zapier,
    }
}
