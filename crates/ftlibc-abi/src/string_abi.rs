//! ABI layer for the libft `<string.h>` comparison functions.
//!
//! Each function is an `extern "C"` entry point that:
//! 1. Short-circuits a zero count before touching either pointer
//! 2. Resolves null pointers through the runtime mode (fault or repair)
//! 3. Measures each string up to the count and delegates to `ftlibc-core`

use std::ffi::{c_char, c_int};

use ftlibc_core::string::{self as core_string, CompareBound};

use crate::runtime_policy::{self, SafetyLevel};

/// Length of the C string at `s`, scanning at most `limit` bytes.
///
/// # Safety
///
/// `s` must be non-null and readable up to its NUL terminator or `limit`
/// bytes, whichever comes first.
#[inline]
unsafe fn scan_len(s: *const c_char, limit: usize) -> usize {
    let mut len = 0usize;
    while len < limit {
        // SAFETY: caller guarantees readability up to the terminator or `limit`.
        if unsafe { *s.add(len) } == 0 {
            break;
        }
        len += 1;
    }
    len
}

/// Borrows at most `limit` bytes of the C string at `s` as a slice without
/// its terminator. The core treats the slice end as the NUL.
///
/// # Safety
///
/// Same contract as [`scan_len`].
#[inline]
unsafe fn bounded_bytes<'a>(s: *const c_char, limit: usize) -> &'a [u8] {
    // SAFETY: forwarded caller contract.
    let len = unsafe { scan_len(s, limit) };
    // SAFETY: the `len` bytes starting at `s` were just read successfully.
    unsafe { std::slice::from_raw_parts(s.cast::<u8>(), len) }
}

/// Handles a null string argument. Returns `true` when the call may continue
/// with the null treated as an empty string.
fn null_argument(mode: SafetyLevel) -> bool {
    if mode.heals_enabled() {
        return true;
    }
    raise_fault();
    false
}

/// Deliver `SIGSEGV` the way a null read under host libc would.
///
/// The signal is raised explicitly so no invalid dereference ever happens.
/// Installed handlers see it first. If one returns, the default disposition
/// is restored and the signal raised again: a real fault would recur at the
/// same instruction instead of resuming the call.
fn raise_fault() {
    // SAFETY: raising a signal and resetting a disposition have no
    // memory-safety preconditions.
    unsafe {
        libc::raise(libc::SIGSEGV);
        libc::signal(libc::SIGSEGV, libc::SIG_DFL);
        libc::raise(libc::SIGSEGV);
    }
}

// ---------------------------------------------------------------------------
// ft_strncmp
// ---------------------------------------------------------------------------

/// libft `ft_strncmp` -- compares at most `n` bytes of two strings.
///
/// Returns the difference of the first mismatching bytes (as unsigned
/// values), or `0` when the strings agree over the inspected span.
///
/// # Safety
///
/// Unless null, `s1` and `s2` must point to memory readable up to their NUL
/// terminator or `n` bytes, whichever comes first.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ft_strncmp(s1: *const c_char, s2: *const c_char, n: usize) -> c_int {
    if n == 0 {
        return 0;
    }

    if s1.is_null() || s2.is_null() {
        let mode = runtime_policy::mode();
        if !null_argument(mode) {
            return 0;
        }
    }

    let lhs: &[u8] = if s1.is_null() {
        &[]
    } else {
        // SAFETY: non-null and readable per the function contract.
        unsafe { bounded_bytes(s1, n) }
    };
    let rhs: &[u8] = if s2.is_null() {
        &[]
    } else {
        // SAFETY: non-null and readable per the function contract.
        unsafe { bounded_bytes(s2, n) }
    };

    core_string::strncmp(lhs, rhs, n)
}

// ---------------------------------------------------------------------------
// ft_strncmp_signed
// ---------------------------------------------------------------------------

/// Signed-count variant of [`ft_strncmp`] for call sites that pass `int`.
///
/// The count is converted the way C converts `int` to `size_t`: a negative
/// value wraps to a huge bound, making the comparison effectively unbounded.
/// That is deliberate and never reported as an error.
///
/// # Safety
///
/// Same contract as [`ft_strncmp`], with the wrapped count as the bound.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ft_strncmp_signed(
    s1: *const c_char,
    s2: *const c_char,
    n: c_int,
) -> c_int {
    let bound = CompareBound::from_signed(i64::from(n));
    // SAFETY: forwarded caller contract.
    unsafe { ft_strncmp(s1, s2, bound.get()) }
}
