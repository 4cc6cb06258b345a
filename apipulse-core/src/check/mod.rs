//! URL liveness checking
//!
//! Probes a single URL and derives a verdict:
//! - HEAD probe with a bounded redirect chain and a fixed timeout
//! - GET fallback (small body prefix) when the HEAD answer is doubtful
//! - Parked-domain detection on the final resolved URL
//! - Transport failures recorded as data, never raised

mod classify;
mod client;
mod types;

pub use classify::{classify_response, classify_status, needs_confirmation, prefer_fallback, ProbeOutcome};
pub use client::UrlChecker;
pub use types::{CheckResult, CheckStatus, FailureKind, MAX_ERROR_DETAIL};
