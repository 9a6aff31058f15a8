//! Configurable text encoding for reading and writing source files.
//!
//! Decoding is strict: a byte sequence that is not valid in the configured
//! encoding is an error, never silently replaced. Encoding back is strict in
//! the same way, so a rollback snapshot and a confirmed write always
//! round-trip byte-for-byte.

use encoding_rs::Encoding;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unknown encoding label: {0}")]
    UnknownLabel(String),

    #[error("input is not valid {encoding}")]
    Decode { encoding: &'static str },

    #[error("text cannot be represented in {encoding}")]
    Unmappable { encoding: &'static str },
}

/// A text encoding resolved from a WHATWG label (`utf-8`, `latin1`, `shift_jis`, ...).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    inner: &'static Encoding,
}

impl TextEncoding {
    pub const UTF_8: TextEncoding = TextEncoding {
        inner: encoding_rs::UTF_8,
    };

    /// Resolve an encoding from its label.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|inner| Self { inner })
            .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Decode `bytes` without BOM sniffing and without replacement characters.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        self.inner
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(EncodingError::Decode {
                encoding: self.name(),
            })
    }

    /// Encode `text` back to bytes, failing on unmappable characters.
    ///
    /// encoding_rs cannot produce UTF-16; those encodings fall back to UTF-8
    /// output, which is reported as unmappable rather than written.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let (bytes, used, had_errors) = self.inner.encode(text);
        if had_errors || used != self.inner {
            return Err(EncodingError::Unmappable {
                encoding: self.name(),
            });
        }
        Ok(bytes.into_owned())
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding").field(&self.name()).finish()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
