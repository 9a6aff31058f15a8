use crate::edit::session::SessionState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("cannot {operation} an edit session that is {state}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },

    #[error("{name} no longer exists in the planned text")]
    ScopeNotFound { name: String },

    #[error("{path} changed on disk since the edit was planned")]
    Conflict { path: PathBuf },

    #[error("failed to decode {path} as {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("new content for {path} cannot be encoded as {encoding}")]
    EncodingMismatch {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("before-text verification failed at byte {byte_start}: expected {expected}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EditError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditError::Io {
            path: path.into(),
            source,
        }
    }
}
