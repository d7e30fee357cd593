//! Harness configuration.
//!
//! Defaults come from the environment; the CLI overrides individual fields.

use std::path::PathBuf;

use ftlibc_abi::SafetyLevel;
use ftlibc_abi::runtime_policy;
use serde::{Deserialize, Serialize};

/// Selects [`IsolationMode`]: `fork` or `inline`.
pub const ISOLATION_ENV: &str = "FTLIBC_HARNESS_ISOLATION";
/// Path of the JSONL structured log.
pub const LOG_ENV: &str = "FTLIBC_HARNESS_LOG";

/// Where each case executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// One forked child per case; faults become results.
    Fork,
    /// Same thread as the runner; a fault aborts the run.
    Inline,
}

impl IsolationMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Inline => "inline",
        }
    }

    /// Lenient parser for environment values. Unknown values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fork" | "process" | "isolated" => Some(Self::Fork),
            "inline" | "thread" | "none" => Some(Self::Inline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub isolation: IsolationMode,
    pub log_path: Option<PathBuf>,
    pub mode: SafetyLevel,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            isolation: IsolationMode::Fork,
            log_path: None,
            mode: SafetyLevel::Strict,
        }
    }
}

impl HarnessConfig {
    /// Build from `FTLIBC_HARNESS_ISOLATION`, `FTLIBC_HARNESS_LOG`, and the
    /// ABI runtime mode (`FTLIBC_MODE`).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), runtime_policy::mode())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, mode: SafetyLevel) -> Self {
        let defaults = Self::default();
        Self {
            isolation: lookup(ISOLATION_ENV)
                .and_then(|raw| IsolationMode::parse(&raw))
                .unwrap_or(defaults.isolation),
            log_path: lookup(LOG_ENV)
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from),
            mode,
        }
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationMode) -> Self {
        self.isolation = isolation;
        self
    }

    #[must_use]
    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SafetyLevel) -> Self {
        self.mode = mode;
        self
    }
}
