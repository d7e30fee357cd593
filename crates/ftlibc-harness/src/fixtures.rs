//! Fixture loading and management.

use std::ffi::c_char;

use ftlibc_core::string::CompareBound;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Expected classification of a comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expectation {
    #[serde(rename = "==0")]
    Zero,
    #[serde(rename = "<0")]
    Negative,
    #[serde(rename = ">0")]
    Positive,
    /// The call must die with an invalid-memory signal.
    #[serde(rename = "SIGSEGV")]
    Fault,
}

impl Expectation {
    /// Sign class of a returned value.
    #[must_use]
    pub const fn classify(value: i32) -> Self {
        if value < 0 {
            Self::Negative
        } else if value > 0 {
            Self::Positive
        } else {
            Self::Zero
        }
    }

    /// Whether a returned value satisfies this expectation.
    #[must_use]
    pub fn accepts(self, value: i32) -> bool {
        self != Self::Fault && Self::classify(value) == self
    }

    /// Whether a fatal signal satisfies this expectation.
    #[must_use]
    pub const fn accepts_fault(self, signal: i32) -> bool {
        matches!(self, Self::Fault) && (signal == libc::SIGSEGV || signal == libc::SIGBUS)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "==0",
            Self::Negative => "<0",
            Self::Positive => ">0",
            Self::Fault => "SIGSEGV",
        }
    }
}

/// A single fixture test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// First string; `null` passes a null pointer.
    pub s1: Option<String>,
    /// Second string; `null` passes a null pointer.
    pub s2: Option<String>,
    /// Comparison count as written at the call site. Negative values wrap.
    pub n: i64,
    pub expected: Expectation,
    /// Runtime mode the case applies to: `strict`, `hardened`, or `both`.
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    String::from("both")
}

impl FixtureCase {
    #[must_use]
    pub fn new(name: &str, s1: &str, s2: &str, n: i64, expected: Expectation) -> Self {
        Self {
            name: name.to_string(),
            s1: Some(s1.to_string()),
            s2: Some(s2.to_string()),
            n,
            expected,
            mode: default_mode(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    /// The count after C's `int` to `size_t` conversion.
    #[must_use]
    pub const fn bound(&self) -> CompareBound {
        CompareBound::from_signed(self.n)
    }

    /// Whether the case runs under the given runtime mode.
    #[must_use]
    pub fn applies_to(&self, active_mode: &str) -> bool {
        let case = self.mode.to_ascii_lowercase();
        case == "both" || case == active_mode.to_ascii_lowercase()
    }
}

/// NUL-terminated copy of a fixture string, or `None` for a null pointer.
///
/// Interior NUL bytes are kept; the comparator stops at the first one the
/// same way C would.
#[must_use]
pub fn c_bytes(s: Option<&str>) -> Option<Vec<u8>> {
    s.map(|text| {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        bytes
    })
}

/// Pointer view of [`c_bytes`] output.
#[must_use]
pub fn c_ptr(bytes: Option<&[u8]>) -> *const c_char {
    bytes.map_or(std::ptr::null(), |b| b.as_ptr().cast())
}

/// A collection of fixture cases for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Function family name, e.g. `string/strncmp`.
    pub family: String,
    /// Exported symbol under test; also the transcript title.
    pub symbol: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_json(&content)?;
        Ok(set)
    }

    /// Hex SHA-256 of the compact JSON encoding.
    #[must_use]
    pub fn sha256_hex(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// The sixteen reference `ft_strncmp` cases.
    #[must_use]
    pub fn builtin_strncmp() -> Self {
        use Expectation::{Negative, Positive, Zero};

        let rows: [(&str, &str, i64, Expectation); 16] = [
            ("t", "", 0, Zero),
            ("1234", "1235", 3, Zero),
            ("1234", "1235", 4, Negative),
            ("1234", "1235", -1, Negative),
            ("", "", 42, Zero),
            ("hackademy", "hackademy", 42, Zero),
            ("Hackademy", "hackademy", 42, Negative),
            ("hackademy", "hacKademy", 42, Positive),
            ("hackademy", "hackademY", 42, Positive),
            ("hackademy", "hackademyX", 42, Negative),
            ("hackademy", "Tripouill", 42, Positive),
            ("", "1", 0, Zero),
            ("1", "", 0, Zero),
            ("", "1", 1, Negative),
            ("1", "", 1, Positive),
            ("", "", 1, Zero),
        ];

        Self {
            version: String::from("v1"),
            family: String::from("string/strncmp"),
            symbol: String::from("ft_strncmp"),
            cases: rows
                .iter()
                .enumerate()
                .map(|(i, (s1, s2, n, expected))| {
                    FixtureCase::new(&format!("strncmp_{:02}", i + 1), s1, s2, *n, *expected)
                })
                .collect(),
        }
    }

    /// Null-pointer cases whose verdict depends on the runtime mode.
    #[must_use]
    pub fn builtin_strncmp_null() -> Self {
        let null_lhs = |name: &str, expected: Expectation, mode: &str| FixtureCase {
            s1: None,
            ..FixtureCase::new(name, "", "1", 1, expected).with_mode(mode)
        };
        let null_rhs = |name: &str, expected: Expectation, mode: &str| FixtureCase {
            s2: None,
            ..FixtureCase::new(name, "1", "", 1, expected).with_mode(mode)
        };

        Self {
            version: String::from("v1"),
            family: String::from("string/strncmp-null"),
            symbol: String::from("ft_strncmp"),
            cases: vec![
                null_lhs("strict_null_lhs", Expectation::Fault, "strict"),
                null_rhs("strict_null_rhs", Expectation::Fault, "strict"),
                null_lhs("hardened_null_lhs", Expectation::Negative, "hardened"),
                null_rhs("hardened_null_rhs", Expectation::Positive, "hardened"),
                FixtureCase {
                    s1: None,
                    s2: None,
                    ..FixtureCase::new("null_zero_count", "", "", 0, Expectation::Zero)
                },
            ],
        }
    }
}
