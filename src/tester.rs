//! Fixture-driven checks of a live service adapter
//!
//! A fixture file lists one expectation per line as `code|expected`, where `expected`
//! is `notfound`, `blocked` or the literal destination URL. Blank lines and lines
//! starting with `#` are skipped. Shorteners change behavior without notice; running
//! the fixtures against the real service is how adapters are kept honest.

use crate::service::{FetchOutcome, Service};
use std::fmt;
use std::path::Path;

/// Expected result for one fixture line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    NotFound,
    Blocked,
    Url(String),
}

impl Expectation {
    fn parse(value: &str) -> Self {
        match value {
            "notfound" => Self::NotFound,
            "blocked" => Self::Blocked,
            url => Self::Url(url.to_string()),
        }
    }

    /// Returns true when `outcome` satisfies this expectation
    pub fn matches(&self, outcome: &FetchOutcome) -> bool {
        match (self, outcome) {
            (Self::NotFound, FetchOutcome::Absent) => true,
            (Self::Blocked, FetchOutcome::CodeBlocked) => true,
            (Self::Url(expected), FetchOutcome::Resolved(url)) => expected.as_bytes() == url.as_slice(),
            _ => false,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("absent"),
            Self::Blocked => f.write_str("code blocked"),
            Self::Url(url) => write!(f, "resolved to {}", url),
        }
    }
}

/// One `code|expected` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub code: String,
    pub expected: Expectation,
}

/// Parses fixture file content, skipping blanks, comments and lines without `|`
pub fn parse_fixtures(content: &str) -> Vec<Fixture> {
    content
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\n']))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (code, expected) = line.split_once('|')?;
            Some(Fixture {
                code: code.to_string(),
                expected: Expectation::parse(expected),
            })
        })
        .collect()
}

/// Tally of a tester run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestReport {
    pub passed: usize,
    pub failed: usize,
}

impl TestReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs fixtures against a service adapter
pub struct ServiceTester {
    service: Box<dyn Service>,
    fixtures: Vec<Fixture>,
}

impl ServiceTester {
    pub fn new(service: Box<dyn Service>, fixtures: Vec<Fixture>) -> Self {
        Self { service, fixtures }
    }

    /// Loads fixtures from a file
    pub fn from_file(service: Box<dyn Service>, path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(service, parse_fixtures(&content)))
    }

    /// Fetches every fixture code once and compares the outcome
    pub async fn run(&mut self) -> TestReport {
        tracing::info!("Testing service {}", self.service.name());
        let mut report = TestReport::default();

        for fixture in &self.fixtures {
            let outcome = self.service.fetch(&fixture.code).await;
            if fixture.expected.matches(&outcome) {
                tracing::debug!(
                    "Code {}, Expected: {}, Result: {}",
                    fixture.code,
                    fixture.expected,
                    outcome
                );
                report.passed += 1;
            } else {
                tracing::warn!(
                    "Code {}, Expected: {}, Result: {}",
                    fixture.code,
                    fixture.expected,
                    outcome
                );
                report.failed += 1;
            }
        }

        tracing::info!(
            "Finished testing: {} passed, {} failed",
            report.passed,
            report.failed
        );
        report
    }
}
