use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("failed to decode {path} as {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no node named '{segment}' under '{parent}' (looking up '{target}'){}", suggestion_hint(.suggestion))]
    NotFound {
        target: String,
        segment: String,
        parent: String,
        suggestion: Option<String>,
    },

    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("path does not exist: {0}")]
    MissingRoot(PathBuf),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!("; did you mean '{name}'?"),
        None => String::new(),
    }
}
