//! Conformance harness for the libft string primitives.
//!
//! Runs fixture cases against the exported C entry points, one forked child
//! per case, and reports each verdict together with a scoped leak check.

pub mod check;
pub mod config;
pub mod fixtures;
pub mod isolate;
pub mod leaks;
pub mod report;
pub mod structured_log;
pub mod suite;

pub use check::{CheckRecorder, CheckSummary};
pub use config::{HarnessConfig, IsolationMode};
pub use fixtures::{Expectation, FixtureCase, FixtureSet};
pub use isolate::{CaseOutcome, IsolatedRun, run_inline, run_isolated};
pub use leaks::{LeakProbe, LeakReport, TrackingAllocator};
pub use report::SuiteReport;
pub use suite::{CaseResult, SuiteRun, SuiteRunner};
