//! C ABI entry points for the libft string primitives.
//!
//! Each entry point validates its raw pointer arguments according to the
//! process runtime mode, then delegates to `ftlibc-core`.

pub mod runtime_policy;
pub mod string_abi;

pub use runtime_policy::SafetyLevel;
