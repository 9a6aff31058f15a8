//! srctree: structural search and edit for indentation-structured source
//!
//! Builds a navigable tree of directories, files, classes, functions and
//! properties from Python-like source without a full grammar, searches it
//! line by line while keeping each match's owning node, and applies
//! find-and-replace edits with confirm and rollback.
//!
//! # Architecture
//!
//! - [`tree`] parses files into non-overlapping line spans and composes them
//!   under directory nodes.
//! - [`pattern`] compiles a pattern and its options into a [`Matcher`].
//! - [`search`] scans every line once and reports [`Match`] records.
//! - [`edit`] plans replacements in memory; every change compiles down to
//!   the byte-span [`Edit`] primitive and is written atomically per file.
//!
//! # Safety
//!
//! - Edits verify their before-text before applying
//! - Confirm refuses files that changed since the plan was made
//! - Atomic file writes (tempfile + fsync + rename)
//! - Rollback restores the exact pre-confirm bytes
//!
//! # Example
//!
//! ```no_run
//! use srctree::{EditSession, PatternSpec, TreeBuilder};
//!
//! let mut tree = TreeBuilder::new().build("src/")?;
//! let matcher = PatternSpec::literal("var").whole_word(true).compile()?;
//!
//! let mut session = EditSession::plan(&tree, tree.root(), &matcher, "value")?;
//! print!("{}", session.diff());
//!
//! let report = session.confirm(&mut tree)?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod edit;
pub mod encoding;
pub mod pattern;
pub mod render;
pub mod search;
pub mod tree;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, EngineConfig};
pub use edit::{Edit, EditError, EditReport, EditSession, EditVerification, SessionState, WriteMode};
pub use encoding::{EncodingError, TextEncoding};
pub use pattern::{Matcher, PatternError, PatternSpec};
pub use render::{ColorScheme, DisplayParams};
pub use search::{find_all, Match};
pub use tree::{
    BuildFailure, Import, ImportField, LineSpan, NodeId, NodeKind, NodeRef, SourceTree,
    StructuralParser, TreeBuilder, TreeError,
};
