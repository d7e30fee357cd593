#![cfg(target_os = "linux")]

//! Integration tests: fixture suites under per-case fork isolation.

use std::path::PathBuf;

use ftlibc_abi::SafetyLevel;
use ftlibc_harness::structured_log::{LogEmitter, validate_log_file};
use ftlibc_harness::{
    CaseOutcome, Expectation, FixtureCase, FixtureSet, HarnessConfig, IsolationMode, LeakProbe,
    SuiteReport, SuiteRunner, TrackingAllocator, run_isolated,
};
use serde_json::Value;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn fork_runner(mode: SafetyLevel) -> SuiteRunner {
    SuiteRunner::new(
        HarnessConfig::default()
            .with_isolation(IsolationMode::Fork)
            .with_mode(mode),
    )
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ftlibc-harness-{}-{name}", std::process::id()))
}

#[test]
fn builtin_suite_passes_under_fork_isolation() {
    let run = fork_runner(SafetyLevel::Strict)
        .run(&FixtureSet::builtin_strncmp(), None)
        .expect("suite runs");

    assert_eq!(run.summary.total, 16);
    assert!(run.summary.all_passed(), "transcript: {}", run.transcript);
    assert!(run.results.iter().all(|r| r.leaks.tracked && r.leaks.is_clean()));
    let expected_marks: String = (1..=16).map(|i| format!("{i}.OK [MOK] ")).collect();
    assert_eq!(run.transcript, format!("ft_strncmp\t: {expected_marks}\n"));
}

#[test]
fn strict_null_pointer_is_captured_as_segfault() {
    let run = fork_runner(SafetyLevel::Strict)
        .run(&FixtureSet::builtin_strncmp_null(), None)
        .expect("suite runs");

    assert_eq!(run.results.len(), 3);
    for result in &run.results[..2] {
        assert_eq!(
            result.outcome,
            CaseOutcome::Faulted {
                signal: libc::SIGSEGV
            }
        );
        assert!(result.passed, "{} should expect the fault", result.name);
    }
    assert_eq!(run.results[2].outcome, CaseOutcome::Returned { value: 0 });
    assert!(run.summary.all_passed());
}

#[test]
fn unexpected_fault_is_reported_without_killing_the_run() {
    let set = FixtureSet {
        version: String::from("v1"),
        family: String::from("string/strncmp-null"),
        symbol: String::from("ft_strncmp"),
        cases: vec![
            FixtureCase {
                s1: None,
                ..FixtureCase::new("null_expected_negative", "", "1", 1, Expectation::Negative)
            },
            FixtureCase::new("after_fault", "1234", "1235", 4, Expectation::Negative),
        ],
    };
    let run = fork_runner(SafetyLevel::Strict)
        .run(&set, None)
        .expect("suite runs");

    assert_eq!(run.summary.faulted, 1);
    assert_eq!(run.summary.passed, 1);
    assert_eq!(run.transcript, "ft_strncmp\t: 1.SIGSEGV [MOK] 2.OK [MOK] \n");
}

#[test]
fn hardened_null_pointer_compares_as_empty() {
    let run = fork_runner(SafetyLevel::Hardened)
        .run(&FixtureSet::builtin_strncmp_null(), None)
        .expect("suite runs");

    let names: Vec<&str> = run.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["hardened_null_lhs", "hardened_null_rhs", "null_zero_count"]
    );
    assert!(run.summary.all_passed(), "transcript: {}", run.transcript);
}

#[test]
fn leaking_case_is_flagged_by_child_probe() {
    let run = run_isolated(|| {
        let leaked = Box::leak(Box::new([1_u8; 48]));
        i32::from(leaked[0])
    })
    .expect("fork boundary");

    assert_eq!(run.outcome, CaseOutcome::Returned { value: 1 });
    assert!(run.leaks.tracked);
    assert_eq!(run.leaks.outstanding_bytes, 48);
}

#[test]
fn comparator_is_leak_free_in_process() {
    let (rc, report) = LeakProbe::measure(|| {
        ftlibc_harness::suite::execute_case(&FixtureCase::new(
            "probe",
            "hackademy",
            "Tripouill",
            42,
            Expectation::Positive,
        ))
    });
    assert!(rc > 0);
    assert!(report.tracked);
    // The fixture strings are copied inside the probe and freed before it closes.
    assert!(report.is_clean());
}

#[test]
fn structured_log_covers_every_case() {
    let log_path = scratch_path("suite.jsonl");
    let mut emitter = LogEmitter::to_file(&log_path, "it-run").expect("log file");
    let run = fork_runner(SafetyLevel::Strict)
        .run(&FixtureSet::builtin_strncmp(), Some(&mut emitter))
        .expect("suite runs");
    drop(emitter);

    let (line_count, errors) = validate_log_file(&log_path).expect("log readable");
    assert!(errors.is_empty(), "log errors: {errors:?}");
    assert_eq!(line_count, run.results.len() + 2);

    let content = std::fs::read_to_string(&log_path).expect("log readable");
    let events: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSONL line must parse"))
        .collect();
    assert_eq!(events[0]["event"], "suite.start");
    assert_eq!(events[1]["case"], "strncmp_01");
    assert_eq!(events[1]["outcome"], "pass");
    assert_eq!(events[4]["details"]["n"], -1);
    assert_eq!(events.last().expect("finish event")["event"], "suite.finish");

    let _ = std::fs::remove_file(&log_path);
}

#[test]
fn report_reflects_fork_run() {
    let run = fork_runner(SafetyLevel::Strict)
        .run(&FixtureSet::builtin_strncmp(), None)
        .expect("suite runs");
    let report = SuiteReport::new("ftlibc", "strict", "fork", "2026-01-01T00:00:00.000Z", vec![run]);

    assert!(report.summary.all_passed());
    let md = report.to_markdown();
    assert!(md.contains("| 4 | strncmp_04 | `<0` | -1 (<0) | clean | PASS |"));
    assert!(md.contains(&FixtureSet::builtin_strncmp().sha256_hex()));
}
