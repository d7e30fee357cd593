//! Safe Rust implementations of the libft string primitives.
//!
//! Every function here operates on byte slices. A NUL byte marks the logical
//! end of a C string, and the end of the slice acts as an implicit NUL when no
//! terminator is present, so nothing in this crate can read out of bounds.

#![forbid(unsafe_code)]

pub mod string;
