//! Staged find-and-replace with confirm and rollback.
//!
//! An [`EditSession`] is planned from search results without touching disk.
//! Confirming writes each affected file through [`atomic_write`]; rolling
//! back restores the bytes each file held just before its write.

pub mod atomic;
pub mod errors;
pub mod session;
pub mod span;

pub use atomic::atomic_write;
pub use errors::EditError;
pub use session::{EditReport, EditSession, FilePlan, SessionState, WriteMode};
pub use span::{Edit, EditVerification};
