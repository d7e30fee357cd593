//! Comparison bound for the `n`-limited string functions.
//!
//! C declares the count parameter of `strncmp` as `size_t`, but historical
//! callers pass `int` literals, including `-1`. The implicit conversion wraps
//! a negative value around to a huge unsigned count. [`CompareBound`] makes
//! that conversion explicit instead of treating it as an error.

/// Maximum number of leading bytes a bounded comparison may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CompareBound(usize);

impl CompareBound {
    /// A bound of exactly `n` bytes.
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self(n)
    }

    /// The largest representable bound. Scans stop at the first terminator
    /// long before it is reached.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self(usize::MAX)
    }

    /// Converts a signed count the way C converts `int` to `size_t`.
    ///
    /// Non-negative values are kept. Negative values wrap modulo
    /// `usize::MAX + 1`, so `-1` becomes `usize::MAX` and every negative
    /// count behaves as an effectively unbounded comparison.
    #[must_use]
    pub const fn from_signed(n: i64) -> Self {
        Self(n as usize)
    }

    /// The raw byte count.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// True when the bound is `0`, which makes every comparison equal.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True when the bound exceeds any addressable string length.
    ///
    /// Wrapped negative counts land here: `-1` through `isize::MIN` all map
    /// into the upper half of the `usize` range.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.0 > isize::MAX as usize
    }
}

impl From<usize> for CompareBound {
    fn from(n: usize) -> Self {
        Self::new(n)
    }
}
