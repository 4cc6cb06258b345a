//! End-to-end health check: load, check, merge, write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::bulk::{BatchRunner, ProgressCallback};
use crate::catalog::Catalogs;
use crate::check::{CheckResult, CheckStatus};
use crate::config::Config;
use crate::error::Result;
use crate::merge::{merge_with, MergeOutcome, MergeStats, StalePolicy, StatusBuckets, UrlIndex};
use crate::report::{write_audit, write_summary};

/// Input and output locations for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub raw: PathBuf,
    pub zapier: PathBuf,
    pub audit: PathBuf,
    pub summary: PathBuf,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("apis-raw.json"),
            zapier: PathBuf::from("apis-zapier.json"),
            audit: PathBuf::from("url-health-check.json"),
            summary: PathBuf::from("health-check-summary.md"),
        }
    }
}

impl PipelinePaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            raw: dir.join(defaults.raw),
            zapier: dir.join(defaults.zapier),
            audit: dir.join(defaults.audit),
            summary: dir.join(defaults.summary),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub total_urls: usize,
    pub alive: usize,
    pub redirect: usize,
    pub deprecated: usize,
    pub warning: usize,
    pub raw: MergeStats,
    pub zapier: MergeStats,
    pub elapsed_ms: u64,
    /// Catalog files were left untouched
    pub dry_run: bool,
}

impl RunOutcome {
    fn new(buckets: &StatusBuckets, merged: &MergeOutcome, elapsed: Duration, dry_run: bool) -> Self {
        Self {
            total_urls: buckets.total(),
            alive: buckets.count(CheckStatus::Alive),
            redirect: buckets.count(CheckStatus::Redirect),
            deprecated: buckets.count(CheckStatus::Deprecated),
            warning: buckets.count(CheckStatus::Warning),
            raw: merged.raw,
            zapier: merged.zapier,
            elapsed_ms: elapsed.as_millis() as u64,
            dry_run,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    runner: BatchRunner,
    stale_policy: StalePolicy,
    dry_run: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(BatchRunner::new())
    }
}

impl Pipeline {
    pub fn new(runner: BatchRunner) -> Self {
        Self {
            runner,
            stale_policy: StalePolicy::default(),
            dry_run: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(BatchRunner::from_config(config)?).with_stale_policy(config.merge.stale_policy))
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Check and report without rewriting the catalogs.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check every distinct catalog URL once.
    pub async fn check_catalogs(
        &self,
        catalogs: &Catalogs,
        progress: Option<ProgressCallback>,
    ) -> (UrlIndex, Vec<CheckResult>) {
        let index = UrlIndex::build(catalogs);
        info!(urls = index.len(), "Total unique URLs to check: {}", index.len());
        let results = self.runner.run_all(index.urls(), progress).await;
        (index, results)
    }

    /// Run the full cycle. Catalog load failures abort before any probe.
    #[instrument(skip(self, progress))]
    pub async fn run(
        &self,
        paths: &PipelinePaths,
        progress: Option<ProgressCallback>,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let catalogs = Catalogs::load(&paths.raw, &paths.zapier)?;

        let (index, results) = self.check_catalogs(&catalogs, progress).await;
        let buckets = StatusBuckets::from_results(&results);
        info!(
            alive = buckets.count(CheckStatus::Alive),
            redirect = buckets.count(CheckStatus::Redirect),
            deprecated = buckets.count(CheckStatus::Deprecated),
            warning = buckets.count(CheckStatus::Warning),
            "Completed {} URLs",
            results.len()
        );

        write_audit(&paths.audit, &results)?;
        write_summary(&paths.summary, &buckets, &index, Utc::now())?;

        let merged = merge_with(&catalogs, &results, self.stale_policy);
        if self.dry_run {
            info!("Dry run, catalogs left unchanged");
        } else {
            merged.catalogs.save(&paths.raw, &paths.zapier)?;
            info!(
                path = %paths.raw.display(),
                "Marked {} entries deprecated", merged.raw.marked
            );
            info!(
                path = %paths.zapier.display(),
                "Marked {} entries deprecated", merged.zapier.marked
            );
        }

        Ok(RunOutcome::new(&buckets, &merged, started.elapsed(), self.dry_run))
    }
}
