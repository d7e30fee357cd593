//! Fixture suite execution.

use std::ffi::c_int;

use ftlibc_abi::SafetyLevel;
use ftlibc_abi::runtime_policy;
use ftlibc_abi::string_abi::{ft_strncmp, ft_strncmp_signed};
use serde::{Deserialize, Serialize};

use crate::check::{CheckRecorder, CheckSummary};
use crate::config::{HarnessConfig, IsolationMode};
use crate::fixtures::{Expectation, FixtureCase, FixtureSet, c_bytes, c_ptr};
use crate::isolate::{CaseOutcome, IsolatedRun, run_inline, run_isolated};
use crate::leaks::LeakReport;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Verdict for one executed case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// 1-based position in the transcript.
    pub index: usize,
    pub name: String,
    pub expected: Expectation,
    pub outcome: CaseOutcome,
    pub leaks: LeakReport,
    pub passed: bool,
}

impl CaseResult {
    /// Human-readable actual result, e.g. `-1 (<0)` or `SIGSEGV`.
    #[must_use]
    pub fn actual(&self) -> String {
        match self.outcome {
            CaseOutcome::Returned { value } => {
                format!("{value} ({})", Expectation::classify(value).as_str())
            }
            CaseOutcome::Faulted { signal } => crate::isolate::signal_name(signal),
            CaseOutcome::Exited { code } => format!("exit {code}"),
            CaseOutcome::Panicked => String::from("panic"),
        }
    }
}

/// Everything one fixture set produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteRun {
    pub family: String,
    pub symbol: String,
    pub fixture_sha256: String,
    pub transcript: String,
    pub summary: CheckSummary,
    pub results: Vec<CaseResult>,
}

/// Call the exported comparator with a fixture's arguments.
///
/// Negative counts that fit in `int` go through the signed entry point, the
/// way the historical call sites pass them; everything else uses the
/// `size_t` entry with the wrapped bound.
#[must_use]
pub fn execute_case(case: &FixtureCase) -> i32 {
    let lhs = c_bytes(case.s1.as_deref());
    let rhs = c_bytes(case.s2.as_deref());
    let (p1, p2) = (c_ptr(lhs.as_deref()), c_ptr(rhs.as_deref()));

    match c_int::try_from(case.n) {
        // SAFETY: non-null pointers reference NUL-terminated buffers that
        // outlive the call; null pointers are resolved by the runtime mode.
        Ok(n) if n < 0 => unsafe { ft_strncmp_signed(p1, p2, n) },
        // SAFETY: as above.
        _ => unsafe { ft_strncmp(p1, p2, case.bound().get()) },
    }
}

fn judge(expected: Expectation, outcome: CaseOutcome) -> bool {
    match outcome {
        CaseOutcome::Returned { value } => expected.accepts(value),
        CaseOutcome::Faulted { signal } => expected.accepts_fault(signal),
        CaseOutcome::Exited { .. } | CaseOutcome::Panicked => false,
    }
}

fn log_outcome(result: &CaseResult) -> Outcome {
    match (result.passed, result.outcome) {
        (true, _) => Outcome::Pass,
        (false, CaseOutcome::Faulted { .. }) => Outcome::Fault,
        (false, _) => Outcome::Fail,
    }
}

/// Pins the process runtime mode for one inline case and puts the previous
/// mode back on drop.
struct PinnedMode {
    previous: SafetyLevel,
}

impl PinnedMode {
    fn pin(mode: SafetyLevel) -> Self {
        let previous = runtime_policy::mode();
        runtime_policy::set_mode(mode);
        Self { previous }
    }
}

impl Drop for PinnedMode {
    fn drop(&mut self) {
        runtime_policy::set_mode(self.previous);
    }
}

pub struct SuiteRunner {
    config: HarnessConfig,
    echo: bool,
}

impl SuiteRunner {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            echo: false,
        }
    }

    /// Stream the transcript to stdout while running.
    #[must_use]
    pub fn echo(mut self, on: bool) -> Self {
        self.echo = on;
        self
    }

    fn execute(&self, case: &FixtureCase) -> std::io::Result<IsolatedRun> {
        let mode = self.config.mode;
        match self.config.isolation {
            IsolationMode::Fork => run_isolated(|| {
                runtime_policy::set_mode(mode);
                execute_case(case)
            }),
            IsolationMode::Inline => {
                let _restore = PinnedMode::pin(mode);
                Ok(run_inline(|| execute_case(case)))
            }
        }
    }

    /// Run every case of `set` that applies to the configured mode. Cases
    /// for the other mode are logged as skipped.
    ///
    /// Case failures are recorded, never returned as errors. An `Err` means
    /// the isolation boundary or the log sink failed.
    pub fn run(
        &self,
        set: &FixtureSet,
        mut log: Option<&mut LogEmitter>,
    ) -> std::io::Result<SuiteRun> {
        let mode = self.config.mode.as_str();
        let mut recorder = CheckRecorder::new(&set.symbol);
        if self.echo {
            recorder = recorder.echo_to_stdout();
        }

        if let Some(emitter) = log.as_deref_mut() {
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "suite.start")
                    .with_symbol(set.symbol.clone())
                    .with_details(serde_json::json!({
                        "family": set.family,
                        "mode": mode,
                        "isolation": self.config.isolation.as_str(),
                        "cases": set.cases.len(),
                    })),
            )?;
        }

        let mut results = Vec::new();
        for case in &set.cases {
            if !case.applies_to(mode) {
                if let Some(emitter) = log.as_deref_mut() {
                    emitter.emit_entry(
                        LogEntry::new("", LogLevel::Debug, "suite.case")
                            .with_symbol(set.symbol.clone())
                            .with_case(case.name.clone())
                            .with_outcome(Outcome::Skip)
                            .with_details(serde_json::json!({ "case_mode": case.mode })),
                    )?;
                }
                continue;
            }

            let run = self.execute(case)?;
            let passed = judge(case.expected, run.outcome);

            let index = match run.outcome {
                CaseOutcome::Faulted { signal } if !passed => recorder.fault(signal),
                _ => recorder.check(passed),
            };
            recorder.show_leaks(&run.leaks);

            let result = CaseResult {
                index,
                name: case.name.clone(),
                expected: case.expected,
                outcome: run.outcome,
                leaks: run.leaks,
                passed,
            };

            if let Some(emitter) = log.as_deref_mut() {
                let level = if result.passed {
                    LogLevel::Info
                } else {
                    LogLevel::Error
                };
                emitter.emit_entry(
                    LogEntry::new("", level, "suite.case")
                            .with_symbol(set.symbol.clone())
                        .with_case(case.name.clone())
                        .with_outcome(log_outcome(&result))
                        .with_details(serde_json::json!({
                            "index": result.index,
                            "s1": case.s1,
                            "s2": case.s2,
                            "n": case.n,
                            "expected": case.expected.as_str(),
                            "actual": result.actual(),
                            "leaks": result.leaks,
                        })),
                )?;
            }
            results.push(result);
        }

        let (transcript, summary) = recorder.finish();

        if let Some(emitter) = log.as_deref_mut() {
            let outcome = if summary.all_passed() {
                Outcome::Pass
            } else {
                Outcome::Fail
            };
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "suite.finish")
                    .with_symbol(set.symbol.clone())
                    .with_outcome(outcome)
                    .with_details(serde_json::to_value(summary)?),
            )?;
            emitter.flush()?;
        }

        Ok(SuiteRun {
            family: set.family.clone(),
            symbol: set.symbol.clone(),
            fixture_sha256: set.sha256_hex(),
            transcript,
            summary,
            results,
        })
    }
}
