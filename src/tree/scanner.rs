//! Line classification for the structural parser.
//!
//! This is not a tokenizer. It tracks just enough lexical state (open
//! triple-quoted strings and bracket depth) to tell whether a line starts a
//! new logical line or continues the previous one, because only the
//! indentation of a logical line's first physical line means anything.

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment { indent: usize },
    Code { indent: usize },
    /// Inside a multi-line string or an unclosed bracket
    Continuation,
}

/// Width of the leading whitespace, with tabs advancing to the next multiple of 8.
pub fn indentation(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            '\x0c' => width = 0,
            _ => break,
        }
    }
    width
}

#[derive(Debug, Default)]
struct LexState {
    triple: Option<&'static [u8]>,
    depth: usize,
}

impl LexState {
    fn in_logical_line(&self) -> bool {
        self.triple.is_some() || self.depth > 0
    }

    /// Advance over one physical line.
    fn feed(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if let Some(quote) = self.triple {
                if bytes[i..].starts_with(quote) {
                    self.triple = None;
                    i += 3;
                } else if bytes[i] == b'\\' {
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            match bytes[i] {
                b'#' => break,
                b'"' | b'\'' => {
                    let quote: &'static [u8] = if bytes[i] == b'"' { b"\"\"\"" } else { b"'''" };
                    if bytes[i..].starts_with(quote) {
                        self.triple = Some(quote);
                        i += 3;
                    } else {
                        i = skip_short_string(bytes, i);
                    }
                }
                b'(' | b'[' | b'{' => {
                    self.depth += 1;
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }
}

/// Returns the index just past the closing quote of the string opened at `start`,
/// or the end of the line for an unterminated string.
fn skip_short_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn starts_header(trimmed: &str) -> bool {
    trimmed.starts_with("def ") || trimmed.starts_with("class ") || trimmed.starts_with("async def ")
}

/// Classify every line of `lines`.
///
/// Unbalanced brackets would otherwise swallow the rest of the file, so a
/// column-0 `def`/`class` inside an open bracket resets the bracket depth.
pub fn classify<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<LineKind> {
    let mut state = LexState::default();
    let mut kinds = Vec::new();

    for line in lines {
        let trimmed = line.trim_start();
        let indent = indentation(line);

        let continues = state.in_logical_line()
            && !(state.triple.is_none() && indent == 0 && starts_header(trimmed));
        if !continues {
            state.depth = 0;
        }

        let kind = if continues {
            LineKind::Continuation
        } else if trimmed.trim_end().is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with('#') {
            LineKind::Comment { indent }
        } else {
            LineKind::Code { indent }
        };

        state.feed(line);
        kinds.push(kind);
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_tabs_and_spaces() {
        assert_eq!(indentation("    x"), 4);
        assert_eq!(indentation("\tx"), 8);
        assert_eq!(indentation("  \tx"), 8);
        assert_eq!(indentation("x"), 0);
    }

    #[test]
    fn test_basic_classification() {
        let kinds = classify(["def f():", "", "    # note", "    return 1"]);
        assert_eq!(
            kinds,
            vec![
                LineKind::Code { indent: 0 },
                LineKind::Blank,
                LineKind::Comment { indent: 4 },
                LineKind::Code { indent: 4 },
            ]
        );
    }

    #[test]
    fn test_docstring_lines_are_continuations() {
        let kinds = classify(["def f():", "    \"\"\"", "Doc at col 0", "    \"\"\"", "x = 1"]);
        assert_eq!(kinds[1], LineKind::Code { indent: 4 });
        assert_eq!(kinds[2], LineKind::Continuation);
        assert_eq!(kinds[3], LineKind::Continuation);
        assert_eq!(kinds[4], LineKind::Code { indent: 0 });
    }

    #[test]
    fn test_open_brackets_continue() {
        let kinds = classify(["x = foo(", "a,", ")", "y = 2"]);
        assert_eq!(kinds[1], LineKind::Continuation);
        assert_eq!(kinds[2], LineKind::Continuation);
        assert_eq!(kinds[3], LineKind::Code { indent: 0 });
    }

    #[test]
    fn test_brackets_in_strings_and_comments_ignored() {
        let kinds = classify(["x = '('  # [", "y = 1"]);
        assert_eq!(kinds[1], LineKind::Code { indent: 0 });
    }

    #[test]
    fn test_unbalanced_bracket_recovers_at_header() {
        let kinds = classify(["x = foo(", "def g():", "    pass"]);
        assert_eq!(kinds[1], LineKind::Code { indent: 0 });
        assert_eq!(kinds[2], LineKind::Code { indent: 4 });
    }
}
