use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::check::{CheckResult, UrlChecker};
use crate::config::{Config, RunnerSettings};
use crate::error::Result;

/// Called after every completed check with `(done, total, url)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Throughput snapshot with a linear ETA projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub done: usize,
    pub total: usize,
    pub elapsed_secs: f64,
    /// Completed checks per second
    pub rate: f64,
    pub eta_secs: f64,
}

impl ProgressReport {
    pub fn new(done: usize, total: usize, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let rate = if elapsed_secs > 0.0 {
            done as f64 / elapsed_secs
        } else {
            0.0
        };
        let eta_secs = if rate > 0.0 {
            total.saturating_sub(done) as f64 / rate
        } else {
            0.0
        };
        Self {
            done,
            total,
            elapsed_secs,
            rate,
            eta_secs,
        }
    }
}

/// Runs URL checks in fixed-size batches with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchRunner {
    concurrency: usize,
    batch_size: usize,
    batch_delay: Duration,
    progress_every: usize,
    checker: UrlChecker,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::with_settings(&RunnerSettings::default(), UrlChecker::new())
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_settings(
            &config.runner,
            UrlChecker::from_config(config)?,
        ))
    }

    fn with_settings(settings: &RunnerSettings, checker: UrlChecker) -> Self {
        Self {
            concurrency: settings.concurrency.max(1),
            batch_size: settings.batch_size.max(1),
            batch_delay: settings.batch_delay(),
            progress_every: settings.progress_every,
            checker,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Delay inserted before each batch after the first.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Log a progress report every `every` completions (0 disables).
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    pub fn with_checker(mut self, checker: UrlChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn checker(&self) -> &UrlChecker {
        &self.checker
    }

    /// Check every distinct URL exactly once.
    ///
    /// Results come back in completion order, one per distinct input URL.
    /// Failed probes are already terminal `deprecated` results and are not
    /// retried.
    pub async fn run_all<I, S>(
        &self,
        urls: I,
        progress: Option<ProgressCallback>,
    ) -> Vec<CheckResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls = dedupe(urls);
        let total = urls.len();
        let started = Instant::now();
        let mut results = Vec::with_capacity(total);
        let mut done = 0;

        debug!(
            total = total,
            concurrency = self.concurrency,
            batch_size = self.batch_size,
            "Starting batch run"
        );

        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            // Polite delay between batches
            if index > 0 && !self.batch_delay.is_zero() {
                sleep(self.batch_delay).await;
            }

            // At most `concurrency` checks in flight
            let mut completions = stream::iter(batch)
                .map(|url| self.checker.check(url))
                .buffer_unordered(self.concurrency);

            while let Some(result) = completions.next().await {
                done += 1;

                if let Some(progress) = progress.as_ref() {
                    progress(done, total, &result.url);
                }

                if self.progress_every > 0 && done % self.progress_every == 0 {
                    let report = ProgressReport::new(done, total, started.elapsed());
                    info!(
                        rate = report.rate,
                        "[{}/{}] {:.0}s elapsed, ETA ~{:.0}s",
                        report.done,
                        report.total,
                        report.elapsed_secs,
                        report.eta_secs
                    );
                }

                results.push(result);
            }
        }

        info!(
            total = total,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Completed batch run"
        );

        results
    }
}

/// Drop repeated URLs, keeping first-seen order.
fn dedupe<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(Into::into)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Read target URLs from a plain list: one per line, `#` comments, or CSV
/// (first column).
pub fn parse_urls_from_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').next().unwrap_or(line).trim().to_string())
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .collect()
}
