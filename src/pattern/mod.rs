//! Pattern compilation for line-oriented search.
//!
//! A [`PatternSpec`] bundles the user's pattern with its matching options
//! (literal or regex, whole-word, case sensitivity) and compiles down to a
//! single [`Matcher`]. Every search and edit in the crate goes through a
//! `Matcher`, so the dialects behave identically everywhere.

pub mod cache;
pub mod errors;
pub mod matcher;

pub use errors::PatternError;
pub use matcher::{compile, Matcher, PatternSpec};
