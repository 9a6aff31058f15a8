//! Property tests over generated source
//!
//! Line soups mix headers, decorators, comments, open brackets and
//! unterminated strings at random indentation.

mod partition;
mod round_trip;

use proptest::prelude::*;

const VOCABULARY: &[&str] = &[
    "class A:",
    "class B(A):",
    "def f(self):",
    "async def g(x,",
    "        y):",
    "@property",
    "@decorator.call(1)",
    "x = 1",
    "return x",
    "# comment",
    "",
    "\"\"\"doc",
    "'''",
    "value = (1,",
    "2)",
    "pass",
    "else:",
    "token = 'token'",
];

/// Source text built from indented vocabulary lines.
pub fn source_text() -> impl Strategy<Value = String> {
    prop::collection::vec((0usize..4, prop::sample::select(VOCABULARY)), 0..40).prop_map(|lines| {
        let mut text = String::new();
        for (depth, line) in lines {
            if !line.is_empty() {
                text.push_str(&"    ".repeat(depth));
            }
            text.push_str(line);
            text.push('\n');
        }
        text
    })
}
