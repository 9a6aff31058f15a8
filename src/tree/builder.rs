//! Building a [`SourceTree`] from the filesystem.

use crate::encoding::TextEncoding;
use crate::tree::errors::TreeError;
use crate::tree::node::{LineSpan, Node, NodeId, NodeKind};
use crate::tree::parser::{self, StructuralParser};
use crate::tree::{BuildFailure, DirEntry, SourceFile, SourceTree};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Path components skipped when no ignore list is given.
pub const DEFAULT_IGNORE_PATHS: &[&str] = &["build", ".git", ".github"];

/// Reads, decodes and parses individual files.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    encoding: TextEncoding,
    parser: StructuralParser,
}

impl FileLoader {
    pub fn new(encoding: TextEncoding, parser: StructuralParser) -> Self {
        Self { encoding, parser }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Load the file at `path`; unstructured files get a single `Content` child.
    pub fn load(&self, path: &Path, name: &str, structured: bool) -> Result<SourceFile, TreeError> {
        let bytes = fs::read(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = self.encoding.decode(&bytes).map_err(|_| TreeError::Decode {
            path: path.to_path_buf(),
            encoding: self.encoding.name(),
        })?;
        Ok(self.parse_text(path.to_path_buf(), name, text, structured))
    }

    pub(crate) fn parse_text(
        &self,
        path: PathBuf,
        name: &str,
        text: String,
        structured: bool,
    ) -> SourceFile {
        let nodes = if structured {
            self.parser.parse(name, &text)
        } else {
            unstructured_nodes(name, &text)
        };
        SourceFile::new(path, text, nodes, structured)
    }
}

fn unstructured_nodes(name: &str, text: &str) -> Vec<Node> {
    let span = LineSpan::new(1, parser::split_lines(text).count());
    let mut file = Node::new(NodeKind::File, name, span, 0, None);
    file.children.push(1);
    vec![file, Node::new(NodeKind::Content, "", span, 0, Some(0))]
}

/// Configures how a directory is turned into a tree.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    loader: FileLoader,
    extensions: Vec<String>,
    ignore: Vec<String>,
    include: Vec<String>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            loader: FileLoader::default(),
            extensions: vec!["py".to_string()],
            ignore: DEFAULT_IGNORE_PATHS.iter().map(|s| s.to_string()).collect(),
            include: Vec::new(),
        }
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.loader.encoding = encoding;
        self
    }

    pub fn parser(mut self, parser: StructuralParser) -> Self {
        self.loader.parser = parser;
        self
    }

    /// File extensions (without the dot) parsed structurally.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the ignore globs.
    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    /// Globs for extra files added whole, without structural parsing.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Build the tree rooted at `root`.
    ///
    /// A file root is parsed structurally whatever its extension and any
    /// failure is returned. Inside a directory, unreadable or undecodable
    /// files are skipped and listed in [`SourceTree::failures`].
    pub fn build(&self, root: impl AsRef<Path>) -> Result<SourceTree, TreeError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(TreeError::MissingRoot(root.to_path_buf()));
        }

        if root.is_file() {
            let file = self.loader.load(root, &file_stem(root), true)?;
            debug!(path = %root.display(), lines = file.line_count(), "parsed file");
            return Ok(SourceTree::from_parts(
                NodeId::file_root(0),
                Vec::new(),
                vec![file],
                Vec::new(),
                self.loader.clone(),
            ));
        }

        let mut walk = Walk {
            builder: self,
            root,
            ignore: compile_globs(&self.ignore)?,
            include: compile_globs(&self.include)?,
            dirs: Vec::new(),
            files: Vec::new(),
            failures: Vec::new(),
        };
        let root_dir = walk.visit_dir(root, true).unwrap_or(0);
        debug!(
            root = %root.display(),
            files = walk.files.len(),
            skipped = walk.failures.len(),
            "built source tree"
        );

        Ok(SourceTree::from_parts(
            NodeId::Dir(root_dir),
            walk.dirs,
            walk.files,
            walk.failures,
            self.loader.clone(),
        ))
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Build a tree for `root`, skipping paths that match any of `ignore`.
pub fn build(root: impl AsRef<Path>, ignore: &[&str]) -> Result<SourceTree, TreeError> {
    TreeBuilder::new().ignore(ignore.iter().copied()).build(root)
}

struct Walk<'a> {
    builder: &'a TreeBuilder,
    root: &'a Path,
    ignore: GlobSet,
    include: GlobSet,
    dirs: Vec<DirEntry>,
    files: Vec<SourceFile>,
    failures: Vec<BuildFailure>,
}

impl Walk<'_> {
    /// Returns the directory's slot, or `None` for a pruned empty directory.
    fn visit_dir(&mut self, dir: &Path, is_root: bool) -> Option<usize> {
        let mut children = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    self.record_failure(
                        TreeError::Io {
                            path: path.clone(),
                            source,
                        },
                        path,
                    );
                    continue;
                }
            };

            let path = entry.path();
            if self.is_ignored(path) {
                debug!(path = %path.display(), "ignored");
                continue;
            }

            if entry.file_type().is_dir() {
                if let Some(sub) = self.visit_dir(path, false) {
                    children.push(NodeId::Dir(sub));
                }
            } else if entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file()) {
                if let Some(file) = self.visit_file(path) {
                    children.push(NodeId::file_root(file));
                }
            } else {
                // Directory links are not followed, so a link cycle cannot recurse
                debug!(path = %path.display(), "skipped: not a regular file");
            }
        }

        if children.is_empty() && !is_root {
            return None;
        }

        let slot = self.dirs.len();
        for child in &children {
            match *child {
                NodeId::Dir(d) => self.dirs[d].parent = Some(slot),
                NodeId::Unit { file, .. } => self.files[file].parent = Some(slot),
            }
        }
        self.dirs.push(DirEntry {
            name: dir_name(dir),
            path: dir.to_path_buf(),
            children,
            parent: None,
        });
        Some(slot)
    }

    fn visit_file(&mut self, path: &Path) -> Option<usize> {
        let (name, structured) = if self.builder.is_source(path) {
            (file_stem(path), true)
        } else if self.matches_any_suffix(&self.include, path) {
            (file_name(path), false)
        } else {
            return None;
        };

        match self.builder.loader.load(path, &name, structured) {
            Ok(file) => {
                debug!(path = %path.display(), lines = file.line_count(), structured, "parsed file");
                self.files.push(file);
                Some(self.files.len() - 1)
            }
            Err(error) => {
                self.record_failure(error, path.to_path_buf());
                None
            }
        }
    }

    fn record_failure(&mut self, error: TreeError, path: PathBuf) {
        warn!(path = %path.display(), %error, "skipping file");
        self.failures.push(BuildFailure { path, error });
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(self.root).unwrap_or(path)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.matches_any_suffix(&self.ignore, path)
    }

    /// Globs match against every trailing run of path components, so
    /// `build` skips a `build` directory at any depth.
    fn matches_any_suffix(&self, globs: &GlobSet, path: &Path) -> bool {
        let components: Vec<_> = self.relative(path).components().collect();
        (0..components.len()).any(|start| {
            let suffix: PathBuf = components[start..].iter().collect();
            globs.is_match(&suffix)
        })
    }
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet, TreeError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| TreeError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| TreeError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .or_else(|| {
            path.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|s| s.to_string_lossy().into_owned()))
        })
        .unwrap_or_default()
}
