use serde::Serialize;
use std::fmt;

/// The variant of a node in a [`SourceTree`](crate::tree::SourceTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
    Class,
    Function,
    /// A function whose decorators satisfy the parser's property predicate
    Property,
    /// Lines not claimed by any recognized header
    Content,
}

impl NodeKind {
    /// Class, function or property: kinds created from a header line.
    pub fn is_structural(self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Function | NodeKind::Property)
    }

    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Property)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Directory => "dir",
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Function => "def",
            NodeKind::Property => "property",
            NodeKind::Content => "content",
        };
        f.write_str(label)
    }
}

/// Inclusive, 1-based line range within a file.
///
/// `end < start` denotes an empty span (an empty file's lone content node is
/// `1..=0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty() -> Self {
        Self { start: 1, end: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }

    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{}:empty", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Identity of a node inside one [`SourceTree`](crate::tree::SourceTree).
///
/// Directory nodes are addressed by their slot in the directory table; every
/// other node by its file and its slot in that file's node table. Ids of a
/// file's nodes are invalidated when the file is re-parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Dir(usize),
    Unit { file: usize, node: usize },
}

impl NodeId {
    pub(crate) fn file_root(file: usize) -> Self {
        NodeId::Unit { file, node: 0 }
    }
}

/// A node of a parsed file. Index 0 of a file's table is the `File` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub name: String,
    pub span: LineSpan,
    /// Indentation of the header line; 0 for file and content nodes
    pub indent: usize,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

impl Node {
    pub(crate) fn new(
        kind: NodeKind,
        name: impl Into<String>,
        span: LineSpan,
        indent: usize,
        parent: Option<usize>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            span,
            indent,
            children: Vec::new(),
            parent,
        }
    }
}
