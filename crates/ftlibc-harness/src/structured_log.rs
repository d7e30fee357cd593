//! Structured JSONL logging for harness runs.
//!
//! Every line is one [`LogEntry`] serialized as a JSON object. The required
//! fields (`timestamp`, `trace_id`, `level`, `event`) are always present;
//! the rest are omitted when unset.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Fields every log line must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["timestamp", "trace_id", "level", "event"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Verdict attached to a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Fault,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// New entry stamped with the current UTC time. An empty `trace_id` is
    /// filled in by [`LogEmitter::emit_entry`].
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: utc_timestamp(SystemTime::now()),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            symbol: None,
            case: None,
            outcome: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_case(mut self, case: impl Into<String>) -> Self {
        self.case = Some(case.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Writes [`LogEntry`] lines to a file or any writer.
pub struct LogEmitter {
    out: Box<dyn Write + Send>,
    run_id: String,
    seq: u64,
}

impl LogEmitter {
    /// Create (or truncate) `path` and emit into it.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::to_writer(BufWriter::new(file), run_id))
    }

    pub fn to_writer(out: impl Write + Send + 'static, run_id: &str) -> Self {
        Self {
            out: Box::new(out),
            run_id: run_id.to_string(),
            seq: 0,
        }
    }

    /// Serialize one entry as a JSON line. Entries without a trace id get
    /// `<run_id>::<seq>`.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        self.seq += 1;
        if entry.trace_id.is_empty() {
            entry.trace_id = format!("{}::{:03}", self.run_id, self.seq);
        }
        serde_json::to_writer(&mut self.out, &entry)?;
        self.out.write_all(b"\n")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// Check JSONL content line by line. Returns the number of non-empty lines
/// and one message per invalid line.
#[must_use]
pub fn validate_log_str(jsonl: &str) -> (usize, Vec<String>) {
    let mut lines = 0usize;
    let mut errors = Vec::new();

    for (line_no, raw) in jsonl.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                errors.push(format!("line {}: invalid JSON: {err}", line_no + 1));
                continue;
            }
        };
        let Some(obj) = value.as_object() else {
            errors.push(format!("line {}: not a JSON object", line_no + 1));
            continue;
        };
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| !obj.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            errors.push(format!(
                "line {}: missing fields: {}",
                line_no + 1,
                missing.join(", ")
            ));
        }
    }

    (lines, errors)
}

/// [`validate_log_str`] over a file.
pub fn validate_log_file(path: &Path) -> std::io::Result<(usize, Vec<String>)> {
    let content = std::fs::read_to_string(path)?;
    Ok(validate_log_str(&content))
}

/// RFC 3339 UTC timestamp with millisecond precision.
#[must_use]
pub fn utc_timestamp(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, UNIX_EPOCH};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn timestamp_formats_known_instants() {
        assert_eq!(utc_timestamp(UNIX_EPOCH), "1970-01-01T00:00:00.000Z");
        let leap_day = UNIX_EPOCH + Duration::from_millis(951_782_400_250);
        assert_eq!(utc_timestamp(leap_day), "2000-02-29T00:00:00.250Z");
    }

    #[test]
    fn emitter_assigns_sequential_trace_ids() {
        let buf = SharedBuf::default();
        let mut emitter = LogEmitter::to_writer(buf.clone(), "run-a");
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Info, "suite.start"))
            .expect("emit");
        emitter
            .emit_entry(
                LogEntry::new("", LogLevel::Info, "suite.case")
                    .with_case("case_01")
                    .with_outcome(Outcome::Pass),
            )
            .expect("emit");
        emitter.flush().expect("flush");

        let text = String::from_utf8(buf.0.lock().expect("buffer lock").clone()).expect("utf8");
        let lines: Vec<LogEntry> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("entry parses"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].trace_id, "run-a::001");
        assert_eq!(lines[1].trace_id, "run-a::002");
        assert_eq!(lines[1].outcome, Some(Outcome::Pass));
        assert_eq!(lines[1].case.as_deref(), Some("case_01"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let line =
            serde_json::to_string(&LogEntry::new("t-1", LogLevel::Warn, "x")).expect("serialize");
        assert!(!line.contains("outcome"));
        assert!(line.contains(r#""level":"warn""#));
    }

    #[test]
    fn validator_reports_missing_fields_and_bad_json() {
        let jsonl = concat!(
            r#"{"timestamp":"t","trace_id":"a","level":"info","event":"e"}"#,
            "\n",
            r#"{"timestamp":"t","level":"info"}"#,
            "\n\n",
            "not json\n",
        );
        let (lines, errors) = validate_log_str(jsonl);
        assert_eq!(lines, 3);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("trace_id"));
        assert!(errors[0].contains("event"));
        assert!(errors[1].contains("invalid JSON"));
    }
}
