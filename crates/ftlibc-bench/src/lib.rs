//! Input shapes shared by the string comparison benchmarks.
//!
//! Every buffer carries a trailing NUL so the same pair can be fed to the
//! safe core (slice view) and to the C entry points (pointer view).

use ftlibc_abi::SafetyLevel;
use ftlibc_abi::runtime_policy;

/// Payload lengths exercised by each benchmark group.
pub const LENGTHS: [usize; 4] = [16, 64, 256, 4096];

/// Where the two strings of a pair first disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairShape {
    /// Identical contents; the scan runs to the terminator or the bound.
    Equal,
    /// Differ at the first byte.
    EarlyMismatch,
    /// Differ at the last byte before the terminator.
    LateMismatch,
    /// The right string is the left one cut in half.
    Prefix,
}

impl PairShape {
    pub const ALL: [Self; 4] = [
        Self::Equal,
        Self::EarlyMismatch,
        Self::LateMismatch,
        Self::Prefix,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::EarlyMismatch => "early_mismatch",
            Self::LateMismatch => "late_mismatch",
            Self::Prefix => "prefix",
        }
    }
}

/// Printable, NUL-free payload of `len` bytes followed by a terminator.
#[must_use]
pub fn c_string(len: usize) -> Vec<u8> {
    let mut buf: Vec<u8> = (0..len).map(|i| b'a' + (i % 26) as u8).collect();
    buf.push(0);
    buf
}

/// Two NUL-terminated buffers of payload length `len` laid out per `shape`.
#[must_use]
pub fn pair(shape: PairShape, len: usize) -> (Vec<u8>, Vec<u8>) {
    let lhs = c_string(len);
    let mut rhs = lhs.clone();
    match shape {
        PairShape::Equal => {}
        PairShape::EarlyMismatch => {
            if len > 0 {
                rhs[0] = b'Z';
            }
        }
        PairShape::LateMismatch => {
            if len > 0 {
                rhs[len - 1] = b'Z';
            }
        }
        PairShape::Prefix => {
            rhs.truncate(len / 2);
            rhs.push(0);
        }
    }
    (lhs, rhs)
}

/// Mode label for bench output, read from `FTLIBC_MODE` with the same
/// aliases the ABI accepts.
#[must_use]
pub fn mode_label() -> &'static str {
    label_for(std::env::var(runtime_policy::MODE_ENV).ok().as_deref())
}

fn label_for(raw: Option<&str>) -> &'static str {
    raw.map_or(SafetyLevel::Strict, runtime_policy::parse_mode_value)
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftlibc_core::string::strncmp;

    #[test]
    fn pairs_compare_as_labelled() {
        for len in LENGTHS {
            let (a, b) = pair(PairShape::Equal, len);
            assert_eq!(strncmp(&a, &b, len), 0);

            let (a, b) = pair(PairShape::EarlyMismatch, len);
            assert!(strncmp(&a, &b, len) > 0);

            let (a, b) = pair(PairShape::LateMismatch, len);
            assert!(strncmp(&a, &b, len) > 0);
            assert_eq!(strncmp(&a, &b, len - 1), 0);

            let (a, b) = pair(PairShape::Prefix, len);
            assert!(strncmp(&a, &b, len) > 0);
            assert_eq!(strncmp(&a, &b, len / 2), 0);
        }
    }

    #[test]
    fn mode_label_follows_abi_aliases() {
        assert_eq!(label_for(None), "strict");
        assert_eq!(label_for(Some("hardened")), "hardened");
        assert_eq!(label_for(Some("REPAIR")), "hardened");
        assert_eq!(label_for(Some("tsm")), "hardened");
        assert_eq!(label_for(Some("full")), "hardened");
        assert_eq!(label_for(Some("off")), "strict");
    }

    #[test]
    fn c_string_is_terminated_once() {
        let s = c_string(30);
        assert_eq!(s.len(), 31);
        assert_eq!(s.iter().position(|&b| b == 0), Some(30));
    }
}
