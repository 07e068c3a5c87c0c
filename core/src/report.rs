//! Results of a matrix run.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use toolmatrix_types::DisplayLabel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { message: String },
    FixtureUnavailable { version: String, message: String },
}

impl Outcome {
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    fn tag(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } | Outcome::FixtureUnavailable { .. } => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationRecord {
    pub index: usize,
    pub label: DisplayLabel,
    pub args: Vec<String>,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test: String,
    pub started_at: DateTime<Utc>,
    /// Set when the test could not start; no invocation ran in that case.
    pub setup_error: Option<String>,
    pub invocations: Vec<InvocationRecord>,
}

impl TestReport {
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            started_at: Utc::now(),
            setup_error: None,
            invocations: Vec::new(),
        }
    }

    pub fn setup_failed(test: impl Into<String>, error: impl ToString) -> Self {
        let mut report = Self::new(test);
        report.setup_error = Some(error.to_string());
        report
    }

    /// Orders records by index and makes duplicate labels unique by suffixing the index.
    pub fn finish(mut self) -> Self {
        self.invocations.sort_by_key(|record| record.index);
        let mut seen = HashSet::new();
        for record in &mut self.invocations {
            if !seen.insert(record.label.clone()) {
                let unique = DisplayLabel::new(format!("{} [{}]", record.label, record.index));
                tracing::debug!(label = %record.label, %unique, "duplicate label");
                seen.insert(unique.clone());
                record.label = unique;
            }
        }
        self
    }

    pub fn passed(&self) -> impl Iterator<Item = &InvocationRecord> {
        self.invocations.iter().filter(|r| r.outcome.is_passed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &InvocationRecord> {
        self.invocations.iter().filter(|r| !r.outcome.is_passed())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.setup_error.is_none() && self.failed().next().is_none()
    }

    #[must_use]
    pub fn record(&self, label: &str) -> Option<&InvocationRecord> {
        self.invocations.iter().find(|r| r.label.as_str() == label)
    }

    /// Plain-text summary without timings.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(error) = &self.setup_error {
            let _ = writeln!(out, "{}: setup failed: {error}", self.test);
            return out;
        }
        let _ = writeln!(
            out,
            "{}: {} passed, {} failed",
            self.test,
            self.passed().count(),
            self.failed().count()
        );
        for record in &self.invocations {
            let _ = write!(out, "  {} {}", record.outcome.tag(), record.label);
            match &record.outcome {
                Outcome::Passed => {}
                Outcome::Failed { message } | Outcome::FixtureUnavailable { message, .. } => {
                    let first_line = message.lines().next().unwrap_or_default();
                    let _ = write!(out, " - {first_line}");
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Panics with the summary unless every invocation passed.
    #[track_caller]
    pub fn assert_success(&self) {
        assert!(self.is_success(), "{}", self.summary());
    }
}
