//! Utilities shared by codart tests.
//!
//! Refactoring tests are driven by fixture directories: a `before/` tree is loaded into memory,
//! transformed, and compared against an `after/` tree. Run with `BLESS=1` to (re)write the
//! expected trees.

mod fixtures;

pub use fixtures::*;
