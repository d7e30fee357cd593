//! String comparison: strlen, strncmp.
//!
//! These are safe Rust implementations operating on byte slices that represent
//! NUL-terminated C strings. In this safe Rust model, strings are `&[u8]` slices
//! where a NUL byte (`0x00`) marks the logical end of the string.

use super::bound::CompareBound;

/// Returns the length of a NUL-terminated byte string (not counting the NUL).
///
/// Equivalent to C `strlen`. Scans `s` for the first `0x00` byte and returns
/// its index. If no NUL is found, returns the full slice length.
pub fn strlen(s: &[u8]) -> usize {
    s.iter().position(|&b| b == 0).unwrap_or(s.len())
}

/// Compares at most `n` bytes of two NUL-terminated byte strings.
///
/// Equivalent to C `strncmp` (libft `ft_strncmp`). Bytes are compared as
/// unsigned values. The scan stops at the first differing byte, at a NUL
/// shared by both strings, or after `n` bytes, whichever comes first.
///
/// Returns `s1[i] - s2[i]` at the first difference, or `0` when the strings
/// agree over the inspected span. A terminator is an ordinary `0` byte here,
/// so a strict prefix compares less than the longer string.
pub fn strncmp(s1: &[u8], s2: &[u8], n: usize) -> i32 {
    for i in 0..n {
        let a = s1.get(i).copied().unwrap_or(0);
        let b = s2.get(i).copied().unwrap_or(0);

        if a != b {
            return i32::from(a) - i32::from(b);
        }
        if a == 0 {
            return 0;
        }
    }
    0
}

/// [`strncmp`] with an explicit [`CompareBound`].
///
/// Use this entry when the count originates from a signed call site.
pub fn strncmp_bounded(s1: &[u8], s2: &[u8], bound: CompareBound) -> i32 {
    strncmp(s1, s2, bound.get())
}
