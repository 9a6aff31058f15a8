use crate::edit::errors::EditError;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with before-text verification.
///
/// Every planned change, whether a replacement or a deletion, compiles down
/// to a set of these applied to a file's decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// Text to put at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find there before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (for whole files and large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    /// Fingerprint of arbitrary bytes.
    pub fn fingerprint(bytes: &[u8]) -> Self {
        EditVerification::Hash(xxh3_64(bytes))
    }
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Validate the edit against `content`, returning the text it replaces.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end
            || self.byte_end > content.len()
            || !content.is_char_boundary(self.byte_start)
            || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply a batch of edits to `content` in one pass.
    ///
    /// Edits are validated against the original text, checked for overlap,
    /// then spliced bottom-to-top so earlier offsets stay valid.
    pub fn apply_all(content: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
        edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

        for edit in &edits {
            edit.validate(content)?;
        }

        // Sorted descending: the earlier edit must end before the later one starts
        for window in edits.windows(2) {
            let (later, earlier) = (&window[0], &window[1]);
            if earlier.byte_end > later.byte_start {
                return Err(EditError::InvalidByteRange {
                    byte_start: later.byte_start,
                    byte_end: earlier.byte_end,
                    len: content.len(),
                });
            }
        }

        let mut out = content.to_string();
        for edit in &edits {
            out.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
        }
        Ok(out)
    }
}
