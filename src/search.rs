//! Line-oriented search over a [`SourceTree`].
//!
//! Every line is scanned exactly once, against the deepest node whose span
//! contains it. Because children partition their parent's lines, that is
//! the node in the pre-order walk that owns the line without delegating it
//! to a child.

use crate::pattern::Matcher;
use crate::tree::{NodeId, NodeKind, SourceTree};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One line containing at least one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// Dotted path of the nearest named node (never a content node)
    pub owner: String,
    /// The node whose own lines include this line
    #[serde(skip)]
    pub node: NodeId,
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The line without its terminator
    pub text: String,
    /// Byte spans of the matches within `text`, left to right
    pub spans: Vec<(usize, usize)>,
}

impl Match {
    /// The matched substrings, in their original casing.
    pub fn matched(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(|&(start, end)| &self.text[start..end])
    }

    /// `text` with every span wrapped by `open` and `close`.
    pub fn marked(&self, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + self.spans.len() * 2);
        let mut cursor = 0;
        for &(start, end) in &self.spans {
            out.push_str(&self.text[cursor..start]);
            out.push_str(open);
            out.push_str(&self.text[start..end]);
            out.push_str(close);
            cursor = end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: '{}'",
            self.file.display(),
            self.line,
            self.marked("<", ">")
        )
    }
}

/// Find every match of `matcher` at or below `root`, in pre-order.
pub fn find_all(tree: &SourceTree, root: NodeId, matcher: &Matcher) -> Vec<Match> {
    let mut matches = Vec::new();

    for node in tree.descendants(root) {
        if node.kind() == NodeKind::Directory {
            continue;
        }
        let (Some(span), Some(file)) = (node.span(), tree.file_of(node.id())) else {
            continue;
        };

        let mut delegated: Vec<_> = node.children().filter_map(|c| c.span()).collect();
        delegated.sort_by_key(|s| s.start);

        let mut owner: Option<String> = None;
        let mut next_child = 0;
        for line in span.lines() {
            while next_child < delegated.len() && delegated[next_child].end < line {
                next_child += 1;
            }
            if delegated
                .get(next_child)
                .is_some_and(|child| child.contains(line))
            {
                continue;
            }

            let Some(text) = file.line(line) else {
                continue;
            };
            let spans = matcher.find_all(text);
            if spans.is_empty() {
                continue;
            }

            let owner = owner
                .get_or_insert_with(|| tree.absolute_name(tree.owner(node.id())))
                .clone();
            matches.push(Match {
                owner,
                node: node.id(),
                file: file.path().to_path_buf(),
                line,
                text: text.to_string(),
                spans,
            });
        }
    }

    matches
}

/// [`find_all`] from the root of `tree`.
pub fn search(tree: &SourceTree, matcher: &Matcher) -> Vec<Match> {
    find_all(tree, tree.root(), matcher)
}
