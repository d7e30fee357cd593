//! Runtime mode selection for ABI entrypoints.
//!
//! The mode is read from `FTLIBC_MODE` on first use and cached for the rest of
//! the process. Only `strict` and `hardened` exist; anything unrecognized
//! resolves to strict.

use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};

/// Environment variable selecting the runtime mode.
pub const MODE_ENV: &str = "FTLIBC_MODE";

/// How ABI entrypoints react to invalid arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Behave exactly like host libc, including faulting on null pointers.
    Strict,
    /// Repair invalid arguments: null strings compare as empty strings.
    Hardened,
}

impl SafetyLevel {
    #[must_use]
    pub const fn heals_enabled(self) -> bool {
        matches!(self, Self::Hardened)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
        }
    }
}

const MODE_UNRESOLVED: u8 = 0;
const MODE_STRICT: u8 = 1;
const MODE_HARDENED: u8 = 2;

static MODE_STATE: AtomicU8 = AtomicU8::new(MODE_UNRESOLVED);

const fn mode_to_u8(mode: SafetyLevel) -> u8 {
    match mode {
        SafetyLevel::Strict => MODE_STRICT,
        SafetyLevel::Hardened => MODE_HARDENED,
    }
}

const fn u8_to_mode(raw: u8) -> SafetyLevel {
    if raw == MODE_HARDENED {
        SafetyLevel::Hardened
    } else {
        SafetyLevel::Strict
    }
}

/// Parses a mode string. Hardened aliases are accepted case-insensitively.
#[must_use]
pub fn parse_mode_value(raw: &str) -> SafetyLevel {
    match raw.trim().to_ascii_lowercase().as_str() {
        "hardened" | "repair" | "tsm" | "full" => SafetyLevel::Hardened,
        "strict" | "default" | "abi" => SafetyLevel::Strict,
        _ => SafetyLevel::Strict,
    }
}

fn mode_from_env() -> SafetyLevel {
    std::env::var(MODE_ENV)
        .map(|raw| parse_mode_value(&raw))
        .unwrap_or(SafetyLevel::Strict)
}

/// The process runtime mode, resolved from the environment on first call.
#[must_use]
pub fn mode() -> SafetyLevel {
    let cached = MODE_STATE.load(AtomicOrdering::Relaxed);
    if cached != MODE_UNRESOLVED {
        return u8_to_mode(cached);
    }

    let resolved = mode_to_u8(mode_from_env());
    match MODE_STATE.compare_exchange(
        MODE_UNRESOLVED,
        resolved,
        AtomicOrdering::SeqCst,
        AtomicOrdering::Relaxed,
    ) {
        Ok(_) => u8_to_mode(resolved),
        // Another thread won the race; its answer is the process answer.
        Err(existing) => u8_to_mode(existing),
    }
}

/// Pins the process runtime mode, overriding the environment.
///
/// Intended for harness binaries that take the mode from a command-line flag.
pub fn set_mode(mode: SafetyLevel) {
    MODE_STATE.store(mode_to_u8(mode), AtomicOrdering::SeqCst);
}

#[cfg(test)]
pub(crate) fn reset_mode_for_tests() {
    MODE_STATE.store(MODE_UNRESOLVED, AtomicOrdering::SeqCst);
}

#[cfg(test)]
pub(crate) fn mode_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    struct EnvVarGuard {
        previous: Option<OsString>,
    }

    impl EnvVarGuard {
        fn set(value: Option<&str>) -> Self {
            let previous = std::env::var_os(MODE_ENV);
            // SAFETY: test-only env mutation is serialized by `mode_lock`.
            unsafe {
                if let Some(v) = value {
                    std::env::set_var(MODE_ENV, v);
                } else {
                    std::env::remove_var(MODE_ENV);
                }
            }
            Self { previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            // SAFETY: test-only env mutation is serialized by `mode_lock`.
            unsafe {
                if let Some(previous) = self.previous.as_ref() {
                    std::env::set_var(MODE_ENV, previous);
                } else {
                    std::env::remove_var(MODE_ENV);
                }
            }
            reset_mode_for_tests();
        }
    }

    #[test]
    fn mode_value_parser_is_strict_or_hardened_only() {
        assert_eq!(parse_mode_value("strict"), SafetyLevel::Strict);
        assert_eq!(parse_mode_value("hardened"), SafetyLevel::Hardened);
        assert_eq!(parse_mode_value("REPAIR"), SafetyLevel::Hardened);
        assert_eq!(parse_mode_value(" tsm "), SafetyLevel::Hardened);
        assert_eq!(parse_mode_value("off"), SafetyLevel::Strict);
        assert_eq!(parse_mode_value(""), SafetyLevel::Strict);
    }

    #[test]
    fn unset_environment_resolves_strict() {
        let _lock = mode_lock();
        let _env = EnvVarGuard::set(None);
        reset_mode_for_tests();
        assert_eq!(mode(), SafetyLevel::Strict);
    }

    #[test]
    fn mode_resolution_is_sticky_until_reset() {
        let _lock = mode_lock();
        let _env = EnvVarGuard::set(Some("hardened"));
        reset_mode_for_tests();

        assert_eq!(mode(), SafetyLevel::Hardened);
        // SAFETY: test-only env mutation is serialized by `mode_lock`.
        unsafe {
            std::env::set_var(MODE_ENV, "strict");
        }
        assert_eq!(
            mode(),
            SafetyLevel::Hardened,
            "resolved mode must remain process-sticky until reset"
        );
    }

    #[test]
    fn set_mode_overrides_environment() {
        let _lock = mode_lock();
        let _env = EnvVarGuard::set(Some("strict"));
        reset_mode_for_tests();

        set_mode(SafetyLevel::Hardened);
        assert_eq!(mode(), SafetyLevel::Hardened);
        assert!(mode().heals_enabled());
    }
}
