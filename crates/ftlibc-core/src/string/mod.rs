//! String operations.
//!
//! Implements the `<string.h>` comparison subset as safe Rust operating on slices.

pub mod bound;
pub mod str;

pub use bound::CompareBound;
pub use str::{strlen, strncmp, strncmp_bounded};
