//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::check::CheckSummary;
use crate::suite::SuiteRun;

/// Totals across every suite in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub suites: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub faulted: usize,
    pub leaked: usize,
}

impl ReportSummary {
    fn absorb(&mut self, summary: &CheckSummary) {
        self.suites += 1;
        self.total += summary.total;
        self.passed += summary.passed;
        self.failed += summary.failed;
        self.faulted += summary.faulted;
        self.leaked += summary.leaked;
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0 && self.faulted == 0 && self.leaked == 0
    }
}

/// A conformance report over one or more suite runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Report title.
    pub title: String,
    /// Runtime mode tested (strict or hardened).
    pub mode: String,
    /// Isolation used for each case (fork or inline).
    pub isolation: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub summary: ReportSummary,
    pub runs: Vec<SuiteRun>,
}

impl SuiteReport {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        mode: impl Into<String>,
        isolation: impl Into<String>,
        timestamp: impl Into<String>,
        runs: Vec<SuiteRun>,
    ) -> Self {
        let mut summary = ReportSummary::default();
        for run in &runs {
            summary.absorb(&run.summary);
        }
        Self {
            title: title.into(),
            mode: mode.into(),
            isolation: isolation.into(),
            timestamp: timestamp.into(),
            summary,
            runs,
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Isolation: {}\n", self.isolation));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n", self.summary.failed));
        out.push_str(&format!("- Faulted: {}\n", self.summary.faulted));
        out.push_str(&format!("- Leaked: {}\n", self.summary.leaked));

        for run in &self.runs {
            out.push_str(&format!("\n## {} (`{}`)\n\n", run.family, run.symbol));
            out.push_str(&format!("- Fixture SHA-256: `{}`\n", run.fixture_sha256));
            out.push_str(&format!("- Transcript: `{}`\n\n", run.transcript.trim_end()));
            out.push_str("| # | Case | Expected | Actual | Leaks | Status |\n");
            out.push_str("|---|------|----------|--------|-------|--------|\n");
            for r in &run.results {
                let status = if r.passed { "PASS" } else { "FAIL" };
                let leaks = if !r.leaks.tracked {
                    String::from("untracked")
                } else if r.leaks.is_clean() {
                    String::from("clean")
                } else {
                    format!("{} bytes", r.leaks.outstanding_bytes)
                };
                out.push_str(&format!(
                    "| {} | {} | `{}` | {} | {} | {} |\n",
                    r.index,
                    r.name,
                    r.expected.as_str(),
                    r.actual(),
                    leaks,
                    status
                ));
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
