//! Navigable structural tree over a file or a directory of files.
//!
//! Nodes live in flat tables owned by [`SourceTree`]; parents are plain
//! indices, so the tree has no reference cycles and every lookup goes through
//! the tree. [`NodeRef`] is the borrowed, read-only view handed to callers.
//!
//! # Example
//!
//! ```
//! use srctree::tree::{NodeKind, SourceTree};
//!
//! let tree = SourceTree::from_text("class Foo:\n    def bar(self):\n        pass\n");
//! let bar = tree.resolve("Foo.bar").unwrap();
//! assert_eq!(tree.node(bar).kind(), NodeKind::Function);
//! assert_eq!(tree.absolute_name(bar), "Foo.bar");
//! ```

pub mod builder;
pub mod errors;
pub mod imports;
pub mod node;
pub mod parser;
pub mod scanner;

pub use builder::{build, FileLoader, TreeBuilder, DEFAULT_IGNORE_PATHS};
pub use errors::TreeError;
pub use imports::{group_imports, Import, ImportField, ImportGroups};
pub use node::{LineSpan, NodeId, NodeKind};
pub use parser::{StructuralParser, DEFAULT_PROPERTY_MARKERS};

use crate::tree::node::Node;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static DOCSTRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)\A(?:[ \t]*(?:#[^\n]*)?\r?\n)*[ \t]*[rRuU]?(?:"""(.*?)"""|'''(.*?)''')"#)
        .expect("docstring regex is valid")
});

/// A parsed file: its decoded text and its node table.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
    nodes: Vec<Node>,
    parent: Option<usize>,
    structured: bool,
}

impl SourceFile {
    pub(crate) fn new(path: PathBuf, text: String, nodes: Vec<Node>, structured: bool) -> Self {
        let line_starts = line_starts(&text);
        Self {
            path,
            text,
            line_starts,
            nodes,
            parent: None,
            structured,
        }
    }

    /// Path the file was read from; empty for text parsed in memory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Whether the file went through the structural parser.
    pub fn is_structured(&self) -> bool {
        self.structured
    }

    /// Byte offset where 1-based line `line` starts.
    pub fn line_offset(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|idx| self.line_starts.get(idx))
            .copied()
    }

    /// Line `line` (1-based) without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        let start = self.line_offset(line)?;
        let end = self.line_starts.get(line).copied().unwrap_or(self.text.len());
        Some(
            self.text[start..end]
                .trim_end_matches('\n')
                .trim_end_matches('\r'),
        )
    }

    /// The exact slice of text covering `span`, terminators included.
    pub fn slice(&self, span: LineSpan) -> &str {
        if span.is_empty() {
            return "";
        }
        let Some(start) = self.line_offset(span.start) else {
            return "";
        };
        let end = self
            .line_starts
            .get(span.end)
            .copied()
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    if text.is_empty() {
        return Vec::new();
    }
    std::iter::once(0)
        .chain(
            text.match_indices('\n')
                .map(|(idx, _)| idx + 1)
                .filter(|&idx| idx < text.len()),
        )
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub children: Vec<NodeId>,
    pub parent: Option<usize>,
}

/// A file that could not be added to a directory tree.
#[derive(Debug)]
pub struct BuildFailure {
    pub path: PathBuf,
    pub error: TreeError,
}

/// Structural tree rooted at a single file or a directory.
#[derive(Debug)]
pub struct SourceTree {
    root: NodeId,
    dirs: Vec<DirEntry>,
    files: Vec<SourceFile>,
    failures: Vec<BuildFailure>,
    loader: FileLoader,
}

impl SourceTree {
    pub(crate) fn from_parts(
        root: NodeId,
        dirs: Vec<DirEntry>,
        files: Vec<SourceFile>,
        failures: Vec<BuildFailure>,
        loader: FileLoader,
    ) -> Self {
        Self {
            root,
            dirs,
            files,
            failures,
            loader,
        }
    }

    /// Parse in-memory text as a single unnamed file.
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with(text, FileLoader::default())
    }

    pub fn from_text_with(text: &str, loader: FileLoader) -> Self {
        let file = loader.parse_text(PathBuf::new(), "", text.to_string(), true);
        Self::from_parts(NodeId::file_root(0), Vec::new(), vec![file], Vec::new(), loader)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        match id {
            NodeId::Dir(d) => d < self.dirs.len(),
            NodeId::Unit { file, node } => self
                .files
                .get(file)
                .is_some_and(|f| node < f.nodes.len()),
        }
    }

    /// View of node `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree; use [`SourceTree::get`] for
    /// ids of unknown origin.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        assert!(self.contains(id), "node id {id:?} is not part of this tree");
        NodeRef { tree: self, id }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.contains(id).then_some(NodeRef { tree: self, id })
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Files that were skipped while building, with the reason.
    pub fn failures(&self) -> &[BuildFailure] {
        &self.failures
    }

    /// The file that owns `id`, or `None` for directories.
    pub fn file_of(&self, id: NodeId) -> Option<&SourceFile> {
        match id {
            NodeId::Dir(_) => None,
            NodeId::Unit { file, .. } => self.files.get(file),
        }
    }

    pub fn file_by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    fn unit(&self, file: usize, node: usize) -> &Node {
        &self.files[file].nodes[node]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match id {
            NodeId::Dir(_) => NodeKind::Directory,
            NodeId::Unit { file, node } => self.unit(file, node).kind,
        }
    }

    pub fn name(&self, id: NodeId) -> &str {
        match id {
            NodeId::Dir(d) => &self.dirs[d].name,
            NodeId::Unit { file, node } => &self.unit(file, node).name,
        }
    }

    /// Line span of a file-level node; `None` for directories.
    pub fn span(&self, id: NodeId) -> Option<LineSpan> {
        match id {
            NodeId::Dir(_) => None,
            NodeId::Unit { file, node } => Some(self.unit(file, node).span),
        }
    }

    /// Filesystem path of the directory or of the owning file.
    pub fn path(&self, id: NodeId) -> &Path {
        match id {
            NodeId::Dir(d) => &self.dirs[d].path,
            NodeId::Unit { file, .. } => &self.files[file].path,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match id {
            NodeId::Dir(d) => self.dirs[d].parent.map(NodeId::Dir),
            NodeId::Unit { file, node: 0 } => self.files[file].parent.map(NodeId::Dir),
            NodeId::Unit { file, node } => self
                .unit(file, node)
                .parent
                .map(|p| NodeId::Unit { file, node: p }),
        }
    }

    /// Child ids in stored order.
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        let (dir_children, file, unit_children): (&[NodeId], usize, &[usize]) = match id {
            NodeId::Dir(d) => (self.dirs[d].children.as_slice(), 0, &[][..]),
            NodeId::Unit { file, node } => {
                (&[][..], file, self.unit(file, node).children.as_slice())
            }
        };
        dir_children.iter().copied().chain(
            unit_children
                .iter()
                .map(move |&node| NodeId::Unit { file, node }),
        )
    }

    /// Exact source text of a node; `None` for directories.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match id {
            NodeId::Dir(_) => None,
            NodeId::Unit { file, node } => {
                let f = &self.files[file];
                Some(f.slice(f.nodes[node].span))
            }
        }
    }

    /// Pre-order, depth-first sequence of `id` and all its descendants.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Pre-order sequence of every node in the tree.
    pub fn iter(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    /// The chain of nodes from the root down to `id`, inclusive.
    pub fn track(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Non-empty names along [`SourceTree::track`], joined with dots.
    pub fn absolute_name(&self, id: NodeId) -> String {
        self.track(id)
            .into_iter()
            .map(|n| self.name(n))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Nearest node at or above `id` that is not `Content`.
    pub fn owner(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while self.kind(current) == NodeKind::Content {
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// A function or property defined directly inside a class.
    pub fn is_method(&self, id: NodeId) -> bool {
        self.kind(id).is_callable()
            && self
                .parent(id)
                .is_some_and(|p| self.kind(p) == NodeKind::Class)
    }

    /// Resolve a dotted or slash-delimited path from the root.
    pub fn resolve(&self, expr: &str) -> Result<NodeId, TreeError> {
        self.resolve_from(self.root, expr)
    }

    /// Resolve a path relative to `start`.
    ///
    /// Segments are separated by `.`, `/` or `\`. An empty segment (other than
    /// a trailing one) climbs to the parent, so `".sibling"` is relative to
    /// the parent. A segment may carry a trailing `()`. When several children
    /// share a name the last one wins. A segment naming the current node
    /// itself is accepted, so a path may start with the root's own name.
    ///
    /// Names containing dots, such as included `README.md` files, are found
    /// by trying the longest dot-joined run of segments first.
    pub fn resolve_from(&self, start: NodeId, expr: &str) -> Result<NodeId, TreeError> {
        let normalized = expr.replace('\\', "/");
        let segments: Vec<&str> = normalized.split(['.', '/']).collect();
        // dotted[i] holds when segments i and i + 1 were separated by a dot
        let dotted: Vec<bool> = normalized
            .chars()
            .filter(|c| matches!(c, '.' | '/'))
            .map(|c| c == '.')
            .collect();
        let mut current = start;
        let mut idx = 0;

        while idx < segments.len() {
            let raw = segments[idx];
            if raw.is_empty() {
                if idx + 1 == segments.len() {
                    break;
                }
                current = self.parent(current).ok_or_else(|| TreeError::NotFound {
                    target: expr.to_string(),
                    segment: "..".to_string(),
                    parent: self.absolute_name(current),
                    suggestion: None,
                })?;
                idx += 1;
                continue;
            }

            if let Some((child, last)) = self.find_dotted_child(current, &segments, &dotted, idx) {
                current = child;
                idx = last + 1;
                continue;
            }

            let segment = raw.strip_suffix("()").unwrap_or(raw);
            current = match self.find_child(current, segment) {
                Some(child) => child,
                None if self.name(current) == segment => current,
                None => {
                    return Err(TreeError::NotFound {
                        target: expr.to_string(),
                        segment: segment.to_string(),
                        parent: self.absolute_name(current),
                        suggestion: self.closest_child_name(current, segment),
                    })
                }
            };
            idx += 1;
        }

        Ok(current)
    }

    /// Last non-`Content` child of `id` named `name`.
    fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .rev()
            .find(|&child| self.kind(child) != NodeKind::Content && self.name(child) == name)
    }

    /// Longest run of two or more dot-separated segments starting at `first`
    /// that names a child of `id`, with the index of its last segment.
    fn find_dotted_child(
        &self,
        id: NodeId,
        segments: &[&str],
        dotted: &[bool],
        first: usize,
    ) -> Option<(NodeId, usize)> {
        let mut last = first;
        while last < dotted.len() && dotted[last] && !segments[last + 1].is_empty() {
            last += 1;
        }
        (first + 1..=last).rev().find_map(|end| {
            let joined = segments[first..=end].join(".");
            let name = joined.strip_suffix("()").unwrap_or(&joined);
            self.find_child(id, name).map(|child| (child, end))
        })
    }

    fn closest_child_name(&self, id: NodeId, segment: &str) -> Option<String> {
        self.children(id)
            .map(|child| self.name(child))
            .filter(|name| !name.is_empty())
            .map(|name| (strsim::jaro_winkler(name, segment), name))
            .filter(|(score, _)| *score >= 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, name)| name.to_string())
    }

    /// Docstring of a file, class or function, dedented.
    pub fn docstring(&self, id: NodeId) -> Option<String> {
        let kind = self.kind(id);
        let text = self.text(id)?;
        let body = match kind {
            NodeKind::File => parser::strip_bom(text).to_string(),
            k if k.is_structural() => body_after_header(text)?,
            _ => return None,
        };
        let caps = DOCSTRING.captures(&body)?;
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Some(cleandoc(raw))
    }

    /// Re-read and re-parse the file at `path`, replacing its nodes.
    ///
    /// Ids of the file's previous nodes become stale. Returns `false` when
    /// no file in the tree has that path.
    pub fn reload_file(&mut self, path: &Path) -> Result<bool, TreeError> {
        let Some(idx) = self.files.iter().position(|f| f.path == path) else {
            return Ok(false);
        };

        let current = &self.files[idx];
        let name = current.nodes[0].name.clone();
        let mut reloaded = self.loader.load(path, &name, current.structured)?;
        reloaded.parent = current.parent;
        debug!(path = %path.display(), lines = reloaded.line_count(), "re-parsed file");
        self.files[idx] = reloaded;
        Ok(true)
    }

    /// Re-parse each of `paths` that belongs to the tree, collecting failures.
    pub fn refresh(&mut self, paths: &[PathBuf]) -> Vec<BuildFailure> {
        let mut failures = Vec::new();
        for path in paths {
            if let Err(error) = self.reload_file(path) {
                failures.push(BuildFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
        failures
    }

    /// A copy of the tree with each file in `texts` parsed from the given text
    /// instead of what it was built from. Ids outside those files carry over.
    pub(crate) fn with_texts<'a>(&self, texts: impl IntoIterator<Item = (&'a Path, &'a str)>) -> Self {
        let mut files = self.files.clone();
        for (path, text) in texts {
            let Some(file) = files.iter_mut().find(|f| f.path == path) else {
                continue;
            };
            let name = file.nodes[0].name.clone();
            let mut parsed =
                self.loader
                    .parse_text(path.to_path_buf(), &name, text.to_string(), file.structured);
            parsed.parent = file.parent;
            *file = parsed;
        }
        Self::from_parts(self.root, self.dirs.clone(), files, Vec::new(), self.loader.clone())
    }

    /// The loader used for this tree's files.
    pub fn loader(&self) -> &FileLoader {
        &self.loader
    }
}

/// Lines of a class or function after its (possibly multi-line) header.
fn body_after_header(text: &str) -> Option<String> {
    let lines: Vec<&str> = parser::split_lines(text).collect();
    let kinds = scanner::classify(lines.iter().copied());

    let header = kinds.iter().enumerate().position(|(idx, kind)| {
        matches!(kind, scanner::LineKind::Code { .. }) && !lines[idx].trim_start().starts_with('@')
    })?;
    let body_start = kinds[header + 1..]
        .iter()
        .position(|k| *k != scanner::LineKind::Continuation)
        .map(|offset| header + 1 + offset)?;

    Some(lines[body_start..].join("\n"))
}

/// Strip the common indentation of a docstring's continuation lines.
fn cleandoc(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();
    let margin = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| scanner::indentation(l))
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = vec![first];
    out.extend(rest.iter().map(|l| {
        let cut = l
            .char_indices()
            .take_while(|(_, c)| c.is_whitespace())
            .take(margin)
            .last()
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        l[cut..].trim_end().to_string()
    }));

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    out.join("\n")
}

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SourceTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.id)
    }

    pub fn name(&self) -> &'a str {
        self.tree.name(self.id)
    }

    pub fn span(&self) -> Option<LineSpan> {
        self.tree.span(self.id)
    }

    pub fn path(&self) -> &'a Path {
        self.tree.path(self.id)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.tree.text(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        tree.parent(self.id).map(|id| NodeRef { tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).map(move |id| NodeRef { tree, id })
    }

    pub fn absolute_name(&self) -> String {
        self.tree.absolute_name(self.id)
    }
}

/// Pre-order iterator returned by [`SourceTree::descendants`].
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    tree: &'a SourceTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).rev());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
\"\"\"Module doc.\"\"\"
import os


class Foo:
    \"\"\"First Foo.\"\"\"

    def run(self):
        return 1


class Foo:
    \"\"\"
    Second Foo.

        Indented detail.
    \"\"\"

    @property
    def size(self):
        return 2

    def run(self):
        return self.var_1
";

    #[test]
    fn test_line_access() {
        let tree = SourceTree::from_text("a\r\nb\n\nc");
        let file = &tree.files()[0];
        assert_eq!(file.line_count(), 4);
        assert_eq!(file.line(1), Some("a"));
        assert_eq!(file.line(3), Some(""));
        assert_eq!(file.line(4), Some("c"));
        assert_eq!(file.line(5), None);
        assert_eq!(file.line_offset(2), Some(3));
    }

    #[test]
    fn test_preorder_traversal_is_restartable() {
        let tree = SourceTree::from_text(SAMPLE);
        let first: Vec<NodeId> = tree.iter().map(|n| n.id()).collect();
        let second: Vec<NodeId> = tree.iter().map(|n| n.id()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], tree.root());

        let kinds: Vec<NodeKind> = tree.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds[1], NodeKind::Content);
        assert_eq!(kinds[2], NodeKind::Class);
    }

    #[test]
    fn test_shadowing_resolves_last_definition() {
        let tree = SourceTree::from_text(SAMPLE);
        let foo = tree.resolve("Foo").unwrap();
        assert_eq!(tree.span(foo).unwrap().start, 12);
        let size = tree.resolve("Foo.size()").unwrap();
        assert_eq!(tree.kind(size), NodeKind::Property);
        assert!(tree.is_method(size));
    }

    #[test]
    fn test_slash_paths_and_relative_lookup() {
        let tree = SourceTree::from_text(SAMPLE);
        let run = tree.resolve("Foo/run").unwrap();
        let size = tree.resolve_from(run, ".size").unwrap();
        assert_eq!(tree.name(size), "size");
        assert_eq!(tree.resolve_from(run, "").unwrap(), run);
    }

    #[test]
    fn test_not_found_with_suggestion() {
        let tree = SourceTree::from_text(SAMPLE);
        let err = tree.resolve("Foo.sise").unwrap_err();
        match err {
            TreeError::NotFound {
                segment,
                suggestion,
                ..
            } => {
                assert_eq!(segment, "sise");
                assert_eq!(suggestion.as_deref(), Some("size"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_climbing_past_root_fails() {
        let tree = SourceTree::from_text(SAMPLE);
        assert!(matches!(
            tree.resolve(".Foo"),
            Err(TreeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_absolute_name_and_owner() {
        let tree = SourceTree::from_text(SAMPLE);
        let run = tree.resolve("Foo.run").unwrap();
        assert_eq!(tree.absolute_name(run), "Foo.run");

        let foo = tree.resolve("Foo").unwrap();
        let header = tree.children(foo).next().unwrap();
        assert_eq!(tree.kind(header), NodeKind::Content);
        assert_eq!(tree.owner(header), foo);
        assert_eq!(tree.absolute_name(header), "Foo");
    }

    #[test]
    fn test_text_is_exact_slice() {
        let tree = SourceTree::from_text(SAMPLE);
        let size = tree.resolve("Foo.size").unwrap();
        assert_eq!(
            tree.text(size).unwrap(),
            "    @property\n    def size(self):\n        return 2\n\n"
        );
    }

    #[test]
    fn test_docstrings() {
        let tree = SourceTree::from_text(SAMPLE);
        assert_eq!(tree.docstring(tree.root()).as_deref(), Some("Module doc."));
        let foo = tree.resolve("Foo").unwrap();
        assert_eq!(
            tree.docstring(foo).as_deref(),
            Some("Second Foo.\n\n    Indented detail.")
        );
        let run = tree.resolve("Foo.run").unwrap();
        assert_eq!(tree.docstring(run), None);
    }

    #[test]
    fn test_byte_order_mark_keeps_structure_and_text() {
        let text = "\u{feff}\"\"\"Shop.\"\"\"\nclass A:\n    def f(self):\n        pass\n";
        let tree = SourceTree::from_text(text);
        let a = tree.resolve("A").unwrap();
        assert_eq!(tree.kind(a), NodeKind::Class);
        assert!(tree.is_method(tree.resolve("A.f").unwrap()));
        assert_eq!(tree.docstring(tree.root()).as_deref(), Some("Shop."));
        assert_eq!(tree.text(tree.root()), Some(text));
    }

    #[test]
    fn test_top_level_children_partition_file() {
        let tree = SourceTree::from_text(SAMPLE);
        let total = tree.files()[0].line_count();
        let mut next = 1;
        for child in tree.root_node().children() {
            let span = child.span().unwrap();
            assert_eq!(span.start, next);
            next = span.end + 1;
        }
        assert_eq!(next, total + 1);
    }
}
