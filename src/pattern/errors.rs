use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("invalid pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern '{pattern}' can match an empty string")]
    ZeroWidth { pattern: String },
}
