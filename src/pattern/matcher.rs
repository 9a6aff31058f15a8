use crate::pattern::cache;
use crate::pattern::errors::PatternError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Haystacks used to detect expressions that can produce zero-width matches.
///
/// `regex` never loops on empty matches, but an edit built from an empty span
/// inserts text instead of replacing it, so such patterns are rejected up front.
const ZERO_WIDTH_SAMPLES: &[&str] = &["", " ", "a", "_", "0", "a b", "\t", "(", "a.b"];

/// A user pattern plus the options that control how it is matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    /// Interpret `pattern` as a regular expression instead of literal text
    #[serde(default)]
    pub regex: bool,
    /// Require word boundaries on both ends of every match
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

impl PatternSpec {
    /// Literal, case-sensitive pattern.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            regex: false,
            whole_word: false,
            case_sensitive: true,
        }
    }

    /// Regular-expression, case-sensitive pattern.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            regex: true,
            ..Self::literal(pattern)
        }
    }

    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The expression handed to the regex engine after escaping and wrapping.
    pub fn expression(&self) -> String {
        let body = if self.regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };
        if self.whole_word {
            format!(r"\b(?:{body})\b")
        } else {
            body
        }
    }

    pub fn compile(&self) -> Result<Matcher, PatternError> {
        if self.pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let regex = cache::get_or_compile(&self.expression(), self.case_sensitive).map_err(
            |source| PatternError::Invalid {
                pattern: self.pattern.clone(),
                source,
            },
        )?;

        let zero_width = ZERO_WIDTH_SAMPLES
            .iter()
            .any(|sample| regex.find_iter(sample).any(|m| m.is_empty()));
        if zero_width {
            return Err(PatternError::ZeroWidth {
                pattern: self.pattern.clone(),
            });
        }

        Ok(Matcher {
            spec: self.clone(),
            regex,
        })
    }
}

/// Compile a pattern with explicit options.
pub fn compile(
    pattern: &str,
    regex: bool,
    whole_word: bool,
    case_sensitive: bool,
) -> Result<Matcher, PatternError> {
    PatternSpec {
        pattern: pattern.to_string(),
        regex,
        whole_word,
        case_sensitive,
    }
    .compile()
}

/// A compiled pattern that yields non-overlapping byte spans within a line.
#[derive(Debug, Clone)]
pub struct Matcher {
    spec: PatternSpec,
    regex: Regex,
}

impl Matcher {
    /// All non-overlapping `(start, end)` byte spans in `line`, left to right.
    ///
    /// Zero-width matches that slip past the compile-time check are dropped.
    pub fn find_all(&self, line: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(line)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    /// Build the replacement text for the match at `span` in `line`.
    ///
    /// Regex patterns expand `$1` / `${name}` references against the match's
    /// captures; literal patterns insert `replacement` verbatim.
    pub fn expand(&self, line: &str, span: (usize, usize), replacement: &str) -> String {
        if !self.spec.regex {
            return replacement.to_string();
        }
        match self.regex.captures_at(line, span.0) {
            Some(caps) if caps.get(0).map(|m| (m.start(), m.end())) == Some(span) => {
                let mut expanded = String::new();
                caps.expand(replacement, &mut expanded);
                expanded
            }
            _ => replacement.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_escaped() {
        let m = PatternSpec::literal("a.b(").compile().unwrap();
        assert_eq!(m.find_all("xa.b(y a_b("), vec![(1, 5)]);
    }

    #[test]
    fn test_whole_word_rejects_partial_word() {
        let m = compile("var", false, true, true).unwrap();
        assert!(m.find_all("self.var_1 = \"x\"").is_empty());
        assert_eq!(m.find_all("self.var = 1"), vec![(5, 8)]);
    }

    #[test]
    fn test_without_whole_word_matches_substring() {
        let m = compile("var", false, false, true).unwrap();
        assert_eq!(m.find_all("self.var_1 = \"x\""), vec![(5, 8)]);
    }

    #[test]
    fn test_case_insensitive_keeps_original_casing() {
        let m = compile("MYBOOK", false, false, false).unwrap();
        let line = "class MyBook:";
        let spans = m.find_all(line);
        assert_eq!(spans, vec![(6, 12)]);
        assert_eq!(&line[spans[0].0..spans[0].1], "MyBook");
    }

    #[test]
    fn test_non_overlapping_left_to_right() {
        let m = PatternSpec::regex("aa").compile().unwrap();
        assert_eq!(m.find_all("aaaaa"), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            PatternSpec::literal("").compile(),
            Err(PatternError::Empty)
        ));
    }

    #[test]
    fn test_zero_width_patterns_rejected() {
        for pattern in ["a*", "^", "$", r"\b", "x?", "(?:)"] {
            let result = PatternSpec::regex(pattern).compile();
            assert!(
                matches!(result, Err(PatternError::ZeroWidth { .. })),
                "{pattern} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(matches!(
            PatternSpec::regex("(open").compile(),
            Err(PatternError::Invalid { .. })
        ));
    }

    #[test]
    fn test_expand_capture_groups() {
        let m = PatternSpec::regex(r"(\w+)_(\d)").compile().unwrap();
        let line = "x = var_1";
        let span = m.find_all(line)[0];
        assert_eq!(m.expand(line, span, "${2}_$1"), "1_var");
    }

    #[test]
    fn test_expand_literal_is_verbatim() {
        let m = PatternSpec::literal("a").compile().unwrap();
        assert_eq!(m.expand("a", (0, 1), "$1"), "$1");
    }
}
