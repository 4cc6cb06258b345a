pub mod bulk;
pub mod catalog;
pub mod check;
pub mod colors;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod parked;
pub mod pipeline;
pub mod report;
pub mod validation;

pub use error::{PulseError, Result};
pub use validation::parse_target_url;

pub use check::{CheckResult, CheckStatus, FailureKind, UrlChecker};
pub use parked::ParkedDomainDetector;

pub use bulk::{BatchRunner, ProgressCallback, ProgressReport};
pub use catalog::{ApiRecord, CatalogSource, Catalogs};
pub use config::Config;
pub use merge::{merge, merge_with, MergeOutcome, MergeStats, StalePolicy, UrlIndex};
pub use pipeline::{Pipeline, PipelinePaths, RunOutcome};

pub use output::{OutputFormat, OutputFormatter};
