//! Detection of parked and for-sale domains.
//!
//! Dead APIs frequently end up on a registrar "buy this domain" page or an
//! ad-parking network after a few redirect hops, and those pages answer with
//! a cheerful 200. Matching the final resolved URL catches them.

use regex::{Regex, RegexBuilder};

use crate::error::{PulseError, Result};

/// Patterns associated with domain-parking and resale services.
pub const DEFAULT_PARKED_PATTERNS: &[&str] = &[
    r"sedo\.com",
    r"godaddy\.com/domainforsale",
    r"dan\.com",
    r"parking",
    r"domainmarket",
    r"buydomains",
    r"hugedomains",
    r"afternic",
    r"undeveloped\.com",
    r"brandpa\.com",
    r"namecheap\.com/domains/registration",
    r"networksolutions",
    r"register\.com",
    r"domain\.com/domains",
    r"domainsbyproxy",
    r"squarespace\.com/domain",
    r"web\.com/domains",
    r"bluehost\.com/domains",
    r"hostgator\.com/domains",
    r"dreamhost\.com/domains",
    r"namebright\.com",
    r"bodis\.com",
    r"above\.com",
    r"parkingcrew\.net",
];

#[derive(Debug, Clone)]
pub struct ParkedDomainDetector {
    patterns: Vec<String>,
    regex: Option<Regex>,
}

impl Default for ParkedDomainDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkedDomainDetector {
    pub fn new() -> Self {
        let patterns: Vec<String> = DEFAULT_PARKED_PATTERNS.iter().map(|p| p.to_string()).collect();
        let regex = compile(&patterns).ok();
        Self { patterns, regex }
    }

    /// Extend the built-in list with additional regex patterns.
    pub fn with_patterns<I, S>(mut self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(extra.into_iter().map(Into::into));
        self.regex = Some(compile(&self.patterns)?);
        Ok(self)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_parked(&self, url: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(url))
    }
}

fn compile(patterns: &[String]) -> Result<Regex> {
    for pattern in patterns {
        Regex::new(pattern)
            .map_err(|e| PulseError::Config(format!("invalid parked pattern {:?}: {}", pattern, e)))?;
    }

    RegexBuilder::new(&patterns.join("|"))
        .case_insensitive(true)
        .build()
        .map_err(|e| PulseError::Config(e.to_string()))
}
