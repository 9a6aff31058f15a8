//! Indentation-driven structural parser.
//!
//! The parser walks the classified lines once, keeping a stack of open
//! `class`/`def` nodes keyed by header indentation. A logical line at
//! indentation `L` closes every open node whose header sits at `L` or deeper.
//! Whatever no header claims ends up in synthetic `Content` nodes, so a
//! file that defeats every heuristic still parses, just flatly.

use crate::tree::node::{LineSpan, Node, NodeKind};
use crate::tree::scanner::{self, LineKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

static CLASS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+([^\W\d]\w*)").expect("class header regex is valid"));
static DEF_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+([^\W\d]\w*)").expect("def header regex is valid")
});
static DECORATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@\s*([\w.]+)").expect("decorator regex is valid"));

/// Decorator names that turn a `def` into a property by default.
pub const DEFAULT_PROPERTY_MARKERS: &[&str] =
    &["property", "cached_property", "functools.cached_property"];

type PropertyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Parser for indentation-structured source text.
#[derive(Clone)]
pub struct StructuralParser {
    is_property: PropertyPredicate,
}

impl fmt::Debug for StructuralParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralParser").finish_non_exhaustive()
    }
}

impl Default for StructuralParser {
    fn default() -> Self {
        Self::with_property_markers(DEFAULT_PROPERTY_MARKERS.iter().copied())
    }
}

impl StructuralParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a `def` as a property when any of its decorators is named in `markers`.
    pub fn with_property_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: HashSet<String> = markers.into_iter().map(Into::into).collect();
        Self::with_property_predicate(move |name| markers.contains(name))
    }

    /// Mark a `def` as a property when `predicate` accepts any of its decorator names.
    pub fn with_property_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            is_property: Arc::new(predicate),
        }
    }

    /// Parse `text` into a node table whose entry 0 is the `File` node.
    ///
    /// The file node is named `name`. Never fails: unrecognized structure
    /// becomes `Content`.
    pub(crate) fn parse(&self, name: &str, text: &str) -> Vec<Node> {
        let mut lines: Vec<&str> = split_lines(text).collect();
        if let Some(first) = lines.first_mut() {
            *first = strip_bom(first);
        }
        let kinds = scanner::classify(lines.iter().copied());
        let next_code = next_code_indents(&kinds);
        let total = lines.len();

        let mut nodes = vec![Node::new(
            NodeKind::File,
            name,
            LineSpan::new(1, total),
            0,
            None,
        )];
        let mut stack: Vec<usize> = Vec::new();
        let mut pending: Option<PendingDecorators> = None;

        for (idx, kind) in kinds.iter().enumerate() {
            let lineno = idx + 1;

            let closing_indent = match *kind {
                LineKind::Code { indent } => Some(indent),
                LineKind::Comment { indent } => {
                    Some(indent.max(next_code[idx].unwrap_or(0)))
                }
                LineKind::Blank | LineKind::Continuation => None,
            };
            if let Some(level) = closing_indent {
                while let Some(&top) = stack.last() {
                    if level > nodes[top].indent {
                        break;
                    }
                    nodes[top].span.end = lineno - 1;
                    stack.pop();
                }
            }

            let LineKind::Code { indent } = *kind else {
                continue;
            };
            let trimmed = lines[idx].trim();

            if let Some(caps) = DECORATOR.captures(trimmed) {
                match pending.as_mut() {
                    Some(p) if p.indent == indent => p.names.push(caps[1].to_string()),
                    _ => {
                        pending = Some(PendingDecorators {
                            start: lineno,
                            indent,
                            names: vec![caps[1].to_string()],
                        })
                    }
                }
                continue;
            }

            let header = if let Some(caps) = CLASS_HEADER.captures(trimmed) {
                Some((NodeKind::Class, caps[1].to_string()))
            } else {
                DEF_HEADER
                    .captures(trimmed)
                    .map(|caps| (NodeKind::Function, caps[1].to_string()))
            };

            let decorators = pending.take();
            let Some((mut node_kind, name)) = header else {
                continue;
            };

            let (start, decorator_names) = match decorators {
                Some(p) if p.indent == indent => (p.start, p.names),
                _ => (lineno, Vec::new()),
            };
            if node_kind == NodeKind::Function
                && decorator_names.iter().any(|d| (self.is_property)(d))
            {
                node_kind = NodeKind::Property;
            }

            let parent = stack.last().copied().unwrap_or(0);
            let id = nodes.len();
            nodes.push(Node::new(
                node_kind,
                name,
                LineSpan::new(start, total),
                indent,
                Some(parent),
            ));
            nodes[parent].children.push(id);
            stack.push(id);
        }

        fill_content(&mut nodes);
        nodes
    }
}

#[derive(Debug)]
struct PendingDecorators {
    start: usize,
    indent: usize,
    names: Vec<String>,
}

/// For every line, the indentation of the first code line after it.
fn next_code_indents(kinds: &[LineKind]) -> Vec<Option<usize>> {
    let mut next = vec![None; kinds.len()];
    let mut upcoming = None;
    for (idx, kind) in kinds.iter().enumerate().rev() {
        next[idx] = upcoming;
        if let LineKind::Code { indent } = *kind {
            upcoming = Some(indent);
        }
    }
    next
}

/// `line` without a leading byte order mark.
pub(crate) fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}

/// Physical lines of `text` without their terminators.
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
        .map(|line| line.trim_end_matches('\n').trim_end_matches('\r'))
}

/// Add `Content` children covering the lines of the file node, and of every
/// structural node with children, that no child claims.
fn fill_content(nodes: &mut Vec<Node>) {
    let original = nodes.len();
    for idx in 0..original {
        if idx != 0 && nodes[idx].children.is_empty() {
            continue;
        }

        let span = nodes[idx].span;
        let children = std::mem::take(&mut nodes[idx].children);
        let mut filled = Vec::with_capacity(children.len() * 2 + 1);
        let mut cursor = span.start;

        for child in children {
            let child_span = nodes[child].span;
            if child_span.start > cursor {
                filled.push(push_content(nodes, idx, cursor, child_span.start - 1));
            }
            filled.push(child);
            cursor = child_span.end + 1;
        }
        if cursor <= span.end {
            filled.push(push_content(nodes, idx, cursor, span.end));
        }
        if filled.is_empty() {
            // Only an empty file gets here
            filled.push(push_content(nodes, idx, 1, 0));
        }

        nodes[idx].children = filled;
    }
}

fn push_content(nodes: &mut Vec<Node>, parent: usize, start: usize, end: usize) -> usize {
    let id = nodes.len();
    nodes.push(Node::new(
        NodeKind::Content,
        "",
        LineSpan::new(start, end),
        0,
        Some(parent),
    ));
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<Node> {
        StructuralParser::new().parse("m", text)
    }

    fn child_summary(nodes: &[Node], idx: usize) -> Vec<(NodeKind, String, usize, usize)> {
        nodes[idx]
            .children
            .iter()
            .map(|&c| {
                let n = &nodes[c];
                (n.kind, n.name.clone(), n.span.start, n.span.end)
            })
            .collect()
    }

    #[test]
    fn test_empty_file_has_single_empty_content() {
        let nodes = parse("");
        assert_eq!(nodes[0].span.len(), 0);
        assert_eq!(nodes[0].children.len(), 1);
        let content = &nodes[nodes[0].children[0]];
        assert_eq!(content.kind, NodeKind::Content);
        assert!(content.span.is_empty());
    }

    #[test]
    fn test_top_level_partition() {
        let text = "import os\n\ndef f(a):\n    return a\n\nclass C:\n    x = 1\n\nprint(1)\n";
        let nodes = parse(text);
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Content, String::new(), 1, 2),
                (NodeKind::Function, "f".to_string(), 3, 5),
                (NodeKind::Class, "C".to_string(), 6, 8),
                (NodeKind::Content, String::new(), 9, 9),
            ]
        );
    }

    #[test]
    fn test_methods_and_properties() {
        let text = "\
class A:
    \"\"\"Doc.\"\"\"

    def __init__(self):
        self.x = 1

    @property
    def x2(self):
        return self.x * 2

    @staticmethod
    def s():
        pass
";
        let nodes = parse(text);
        let class_idx = nodes[0].children[0];
        assert_eq!(nodes[class_idx].kind, NodeKind::Class);
        assert_eq!(
            child_summary(&nodes, class_idx),
            vec![
                (NodeKind::Content, String::new(), 1, 3),
                (NodeKind::Function, "__init__".to_string(), 4, 6),
                (NodeKind::Property, "x2".to_string(), 7, 10),
                (NodeKind::Function, "s".to_string(), 11, 13),
            ]
        );
    }

    #[test]
    fn test_decorators_belong_to_function() {
        let nodes = parse("x = 1\n@cache\n@other(1)\ndef f():\n    pass\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Content, String::new(), 1, 1),
                (NodeKind::Function, "f".to_string(), 2, 5),
            ]
        );
    }

    #[test]
    fn test_custom_property_predicate() {
        let parser = StructuralParser::with_property_predicate(|name| name.ends_with(".getter"));
        let nodes = parser.parse("m", "@value.getter\ndef v():\n    pass\n@property\ndef w():\n    pass\n");
        assert_eq!(nodes[nodes[0].children[0]].kind, NodeKind::Property);
        assert_eq!(nodes[nodes[0].children[1]].kind, NodeKind::Function);
    }

    #[test]
    fn test_unterminated_block_closes_at_eof() {
        let nodes = parse("def f():\n    x = 1\n    y = 2");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![(NodeKind::Function, "f".to_string(), 1, 3)]
        );
    }

    #[test]
    fn test_column_zero_comment_inside_body() {
        let nodes = parse("def f():\n    x = 1\n# inner note\n    return x\nz = 0\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Function, "f".to_string(), 1, 4),
                (NodeKind::Content, String::new(), 5, 5),
            ]
        );
    }

    #[test]
    fn test_comment_between_functions_is_content() {
        let nodes = parse("def f():\n    pass\n# section\ndef g():\n    pass\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Function, "f".to_string(), 1, 2),
                (NodeKind::Content, String::new(), 3, 3),
                (NodeKind::Function, "g".to_string(), 4, 5),
            ]
        );
    }

    #[test]
    fn test_nested_function() {
        let nodes = parse("def outer():\n    def inner():\n        pass\n    return inner\n");
        let outer = nodes[0].children[0];
        assert_eq!(
            child_summary(&nodes, outer),
            vec![
                (NodeKind::Content, String::new(), 1, 1),
                (NodeKind::Function, "inner".to_string(), 2, 3),
                (NodeKind::Content, String::new(), 4, 4),
            ]
        );
    }

    #[test]
    fn test_async_def_and_multiline_signature() {
        let text = "async def fetch(\n    url,\n    timeout=3,\n):\n    return url\nx = 1\n";
        let nodes = parse(text);
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Function, "fetch".to_string(), 1, 5),
                (NodeKind::Content, String::new(), 6, 6),
            ]
        );
    }

    #[test]
    fn test_garbage_degrades_to_content() {
        let nodes = parse("}}} ((( \n\t\t@@\n  class\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![(NodeKind::Content, String::new(), 1, 3)]
        );
    }

    #[test]
    fn test_crlf_lines() {
        let nodes = parse("def f():\r\n    pass\r\nx = 1\r\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Function, "f".to_string(), 1, 2),
                (NodeKind::Content, String::new(), 3, 3),
            ]
        );
    }

    #[test]
    fn test_byte_order_mark_before_header() {
        let nodes = parse("\u{feff}class A:\n    def f(self):\n        pass\n");
        assert_eq!(
            child_summary(&nodes, 0),
            vec![(NodeKind::Class, "A".to_string(), 1, 3)]
        );
        let class = nodes[0].children[0];
        assert_eq!(nodes[nodes[class].children[1]].name, "f");
    }

    #[test]
    fn test_long_comment_run_inside_body() {
        let mut text = String::from("def f():\n    x = 1\n");
        text.push_str(&"# c\n".repeat(50_000));
        text.push_str("    return x\ny = 2\n");
        let nodes = parse(&text);
        assert_eq!(
            child_summary(&nodes, 0),
            vec![
                (NodeKind::Function, "f".to_string(), 1, 50_003),
                (NodeKind::Content, String::new(), 50_004, 50_004),
            ]
        );
    }

    #[test]
    fn test_next_code_indents() {
        let kinds = scanner::classify(["def f():", "# a", "", "    x = 1", "# b"]);
        assert_eq!(
            next_code_indents(&kinds),
            vec![Some(4), Some(4), Some(4), None, None]
        );
    }
}
