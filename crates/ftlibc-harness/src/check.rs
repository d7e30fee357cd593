//! Check recorder producing the classic one-line test transcript.
//!
//! A run looks like `ft_strncmp\t: 1.OK [MOK] 2.OK [MOK] 3.KO [MOK] ...`:
//! the title, then one numbered mark per check followed by its leak mark.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::isolate::signal_name;
use crate::leaks::LeakReport;

/// Counts accumulated over one recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Checks that died on a signal instead of returning.
    pub faulted: usize,
    /// Checks whose leak probe reported outstanding bytes.
    pub leaked: usize,
}

impl CheckSummary {
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0 && self.faulted == 0 && self.leaked == 0
    }
}

pub struct CheckRecorder {
    transcript: String,
    summary: CheckSummary,
    echo: bool,
}

impl CheckRecorder {
    /// Start a transcript with `"{title}\t: "`.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut recorder = Self {
            transcript: String::new(),
            summary: CheckSummary::default(),
            echo: false,
        };
        recorder.push(&format!("{title}\t: "));
        recorder
    }

    /// Also stream every mark to stdout as it is recorded.
    #[must_use]
    pub fn echo_to_stdout(mut self) -> Self {
        if !self.echo {
            self.echo = true;
            let head = self.transcript.clone();
            self.emit(&head);
        }
        self
    }

    fn emit(&self, text: &str) {
        if self.echo {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    fn push(&mut self, text: &str) {
        self.transcript.push_str(text);
        self.emit(text);
    }

    /// Record one logical assertion. Returns its 1-based index.
    pub fn check(&mut self, passed: bool) -> usize {
        self.summary.total += 1;
        if passed {
            self.summary.passed += 1;
        } else {
            self.summary.failed += 1;
        }
        let index = self.summary.total;
        self.push(&format!("{index}.{} ", if passed { "OK" } else { "KO" }));
        index
    }

    /// Record a check that terminated on `signal`. Returns its 1-based index.
    pub fn fault(&mut self, signal: i32) -> usize {
        self.summary.total += 1;
        self.summary.faulted += 1;
        let index = self.summary.total;
        self.push(&format!("{index}.{} ", signal_name(signal)));
        index
    }

    /// Append the leak mark for the most recent check.
    pub fn show_leaks(&mut self, report: &LeakReport) {
        if report.is_clean() {
            self.push("[MOK] ");
        } else {
            self.summary.leaked += 1;
            self.push("[MKO] ");
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    #[must_use]
    pub const fn summary(&self) -> CheckSummary {
        self.summary
    }

    /// Terminate the line and return the transcript with its counts.
    #[must_use]
    pub fn finish(mut self) -> (String, CheckSummary) {
        self.push("\n");
        (self.transcript, self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_numbers_checks_from_one() {
        let mut rec = CheckRecorder::new("ft_strncmp");
        assert_eq!(rec.check(true), 1);
        rec.show_leaks(&LeakReport::untracked());
        assert_eq!(rec.check(false), 2);
        rec.show_leaks(&LeakReport::untracked());

        let (transcript, summary) = rec.finish();
        assert_eq!(transcript, "ft_strncmp\t: 1.OK [MOK] 2.KO [MOK] \n");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn faults_and_leaks_are_counted_separately() {
        let mut rec = CheckRecorder::new("t");
        rec.fault(libc::SIGSEGV);
        rec.check(true);
        rec.show_leaks(&LeakReport {
            tracked: true,
            allocations: 1,
            deallocations: 0,
            outstanding_bytes: 16,
        });

        assert_eq!(rec.transcript(), "t\t: 1.SIGSEGV 2.OK [MKO] ");
        let summary = rec.summary();
        assert_eq!(summary.faulted, 1);
        assert_eq!(summary.leaked, 1);
        assert_eq!(summary.passed, 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn clean_run_passes() {
        let mut rec = CheckRecorder::new("t");
        for _ in 0..3 {
            rec.check(true);
            rec.show_leaks(&LeakReport::untracked());
        }
        assert!(rec.summary().all_passed());
    }
}
