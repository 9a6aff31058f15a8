use crate::edit::atomic::atomic_write;
use crate::edit::errors::EditError;
use crate::edit::span::{Edit, EditVerification};
use crate::encoding::TextEncoding;
use crate::pattern::Matcher;
use crate::search::{find_all, Match};
use crate::tree::{NodeId, SourceTree};
use similar::TextDiff;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lifecycle of an [`EditSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Confirmed,
    RolledBack,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => write!(f, "pending"),
            SessionState::Confirmed => write!(f, "confirmed"),
            SessionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Where confirmed content goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the original file
    #[default]
    Overwrite,
    /// Write to the first free `<stem>_copy.<ext>` beside the original
    Copy,
}

/// Outcome of [`EditSession::confirm`] or [`EditSession::rollback`].
#[derive(Debug, Default)]
pub struct EditReport {
    pub successful: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    /// One error per entry of `failed`, in the same order
    pub errors: Vec<EditError>,
}

impl EditReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, path: &Path, error: EditError) {
        self.failed.push(path.to_path_buf());
        self.errors.push(error);
    }
}

impl fmt::Display for EditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} successful, {} failed",
            self.successful.len(),
            self.failed.len()
        )
    }
}

#[derive(Debug)]
enum FileStatus {
    Planned,
    Failed,
    Written {
        target: PathBuf,
        /// Bytes the target held before the write; `None` when it was created
        snapshot: Option<Vec<u8>>,
        written: EditVerification,
    },
    Restored,
}

/// The planned change to one file.
#[derive(Debug)]
pub struct FilePlan {
    path: PathBuf,
    original: String,
    fingerprint: EditVerification,
    proposed: String,
    matches: Vec<Match>,
    replacements: Vec<Vec<String>>,
    status: FileStatus,
}

impl FilePlan {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Text the plan was computed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn proposed(&self) -> &str {
        &self.proposed
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Replacement text for each span of each match, parallel to [`matches`](Self::matches).
    pub fn replacements(&self) -> &[Vec<String>] {
        &self.replacements
    }

    /// Where confirm wrote this file, if it did.
    pub fn written_to(&self) -> Option<&Path> {
        match &self.status {
            FileStatus::Written { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn diff(&self) -> String {
        let label = self.path.display().to_string();
        TextDiff::from_lines(&self.original, &self.proposed)
            .unified_diff()
            .context_radius(3)
            .header(&label, &label)
            .to_string()
    }

    fn write(&mut self, encoding: TextEncoding, mode: WriteMode) -> Result<(), EditError> {
        if self.path.as_os_str().is_empty() {
            return Err(EditError::io(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "in-memory text has no file to write",
                ),
            ));
        }

        let bytes = encoding
            .encode(&self.proposed)
            .map_err(|_| EditError::EncodingMismatch {
                path: self.path.clone(),
                encoding: encoding.name(),
            })?;

        let (target, snapshot) = match mode {
            WriteMode::Overwrite => {
                let current = self.read_unchanged(encoding)?;
                (self.path.clone(), Some(current))
            }
            WriteMode::Copy => (copy_target(&self.path), None),
        };

        atomic_write(&target, &bytes)?;
        debug!(path = %target.display(), bytes = bytes.len(), "wrote planned content");
        self.status = FileStatus::Written {
            target,
            snapshot,
            written: EditVerification::fingerprint(&bytes),
        };
        Ok(())
    }

    /// Current bytes of the file, provided they still decode to the planned-from text.
    fn read_unchanged(&self, encoding: TextEncoding) -> Result<Vec<u8>, EditError> {
        let meta = fs::metadata(&self.path).map_err(|e| EditError::io(&self.path, e))?;
        if meta.permissions().readonly() {
            return Err(EditError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "file is read-only"),
            ));
        }

        let current = fs::read(&self.path).map_err(|e| EditError::io(&self.path, e))?;
        let text = encoding.decode(&current).map_err(|_| EditError::Decode {
            path: self.path.clone(),
            encoding: encoding.name(),
        })?;
        if !self.fingerprint.matches(&text) {
            return Err(EditError::Conflict {
                path: self.path.clone(),
            });
        }
        Ok(current)
    }

    fn restore(&mut self, force: bool) -> Result<(), EditError> {
        let FileStatus::Written {
            target,
            snapshot,
            written,
        } = &self.status
        else {
            return Ok(());
        };

        if !force {
            let current = fs::read(target).map_err(|e| EditError::io(target, e))?;
            if EditVerification::fingerprint(&current) != *written {
                return Err(EditError::Conflict {
                    path: target.clone(),
                });
            }
        }

        match snapshot {
            Some(bytes) => atomic_write(target, bytes)?,
            None => match fs::remove_file(target) {
                Ok(()) => {}
                Err(e) if force && e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(EditError::io(target, e)),
            },
        }
        debug!(path = %target.display(), "restored pre-confirm content");
        self.status = FileStatus::Restored;
        Ok(())
    }
}

/// First sibling of `path` named `<stem>_copy.<ext>` (repeating `_copy`) that does not exist.
fn copy_target(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while candidate.exists() {
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match candidate.extension() {
            Some(ext) => format!("{stem}_copy.{}", ext.to_string_lossy()),
            None => format!("{stem}_copy"),
        };
        candidate.set_file_name(name);
    }
    candidate
}

/// A planned find-and-replace over a tree, confirmed and rolled back as a unit.
///
/// Planning touches no files. [`confirm`](Self::confirm) writes every
/// affected file independently; a failure on one never stops the others.
#[derive(Debug)]
pub struct EditSession {
    state: SessionState,
    files: Vec<FilePlan>,
    encoding: TextEncoding,
    mode: WriteMode,
}

impl EditSession {
    /// Plan replacing every match of `matcher` at or below `root`.
    ///
    /// In regex mode `replacement` may refer to capture groups (`$1`, `${name}`).
    pub fn plan(
        tree: &SourceTree,
        root: NodeId,
        matcher: &Matcher,
        replacement: &str,
    ) -> Result<Self, EditError> {
        Ok(Self {
            state: SessionState::Pending,
            files: plan_files(tree, root, matcher, replacement)?,
            encoding: tree.loader().encoding(),
            mode: WriteMode::default(),
        })
    }

    /// Plan a further replacement on top of what `base` proposes.
    ///
    /// Files `base` would change are searched in their proposed form, the
    /// rest as `tree` holds them. The result carries every file of `base`,
    /// diffs against the text `base` was planned from and checks for
    /// conflicts against it too, so confirming it writes the combined change
    /// and rolls back to the files as they were before either plan. `base`
    /// stays pending and is not changed. Match line numbers refer to the text
    /// each match was found in.
    pub fn plan_on(
        base: &EditSession,
        tree: &SourceTree,
        root: NodeId,
        matcher: &Matcher,
        replacement: &str,
    ) -> Result<Self, EditError> {
        if base.state != SessionState::Pending {
            return Err(EditError::InvalidState {
                state: base.state,
                operation: "plan on",
            });
        }

        let proposed = tree.with_texts(
            base.files
                .iter()
                .map(|f| (f.path.as_path(), f.proposed.as_str())),
        );
        let scope = rebase_scope(base, tree, &proposed, root)?;
        let mut planned = plan_files(&proposed, scope, matcher, replacement)?;

        let mut files = Vec::with_capacity(base.files.len() + planned.len());
        for prior in &base.files {
            let file = match planned.iter().position(|p| p.path == prior.path) {
                Some(idx) => FilePlan {
                    original: prior.original.clone(),
                    fingerprint: prior.fingerprint.clone(),
                    ..planned.remove(idx)
                },
                None => FilePlan {
                    path: prior.path.clone(),
                    original: prior.original.clone(),
                    fingerprint: prior.fingerprint.clone(),
                    proposed: prior.proposed.clone(),
                    matches: Vec::new(),
                    replacements: Vec::new(),
                    status: FileStatus::Planned,
                },
            };
            files.push(file);
        }
        files.extend(planned);
        files.sort_by_key(|f| tree.files().iter().position(|s| s.path() == f.path.as_path()));

        Ok(Self {
            state: SessionState::Pending,
            files,
            encoding: base.encoding,
            mode: base.mode,
        })
    }

    /// Plan deleting every match of `matcher` at or below `root`.
    pub fn plan_delete(tree: &SourceTree, root: NodeId, matcher: &Matcher) -> Result<Self, EditError> {
        Self::plan(tree, root, matcher, "")
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn files(&self) -> &[FilePlan] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.files.iter().map(|f| f.matches.len()).sum()
    }

    /// Unified diff of every planned file, in plan order.
    pub fn diff(&self) -> String {
        self.files.iter().map(FilePlan::diff).collect()
    }

    /// Write every planned file, then re-parse the written files in `tree`.
    ///
    /// Valid once, from `Pending`. Node ids inside re-parsed files are stale
    /// afterwards; directory ids and file roots stay valid.
    pub fn confirm(&mut self, tree: &mut SourceTree) -> Result<EditReport, EditError> {
        if self.state != SessionState::Pending {
            return Err(EditError::InvalidState {
                state: self.state,
                operation: "confirm",
            });
        }
        self.state = SessionState::Confirmed;

        let mut report = EditReport::default();
        for file in &mut self.files {
            match file.write(self.encoding, self.mode) {
                Ok(()) => report.successful.push(file.path.clone()),
                Err(error) => {
                    file.status = FileStatus::Failed;
                    report.fail(&file.path, error);
                }
            }
        }

        log_failures("confirm", &report);
        reparse(tree, &report);
        Ok(report)
    }

    /// Undo a confirm, refusing files that changed since they were written.
    pub fn rollback(&mut self, tree: &mut SourceTree) -> Result<EditReport, EditError> {
        self.rollback_with(tree, false)
    }

    /// Undo a confirm. With `force`, files changed since the write are restored anyway.
    ///
    /// Files already restored by an earlier rollback are reported successful
    /// again; files that were never written are left out. Restored files are
    /// re-parsed in `tree`.
    pub fn rollback_with(
        &mut self,
        tree: &mut SourceTree,
        force: bool,
    ) -> Result<EditReport, EditError> {
        if self.state == SessionState::Pending {
            return Err(EditError::InvalidState {
                state: self.state,
                operation: "roll back",
            });
        }
        self.state = SessionState::RolledBack;

        let mut report = EditReport::default();
        for file in &mut self.files {
            let restored = match &file.status {
                FileStatus::Planned | FileStatus::Failed => continue,
                FileStatus::Restored => {
                    debug!(path = %file.path.display(), "already restored");
                    Ok(())
                }
                FileStatus::Written { .. } => file.restore(force),
            };
            match restored {
                Ok(()) => report.successful.push(file.path.clone()),
                Err(error) => report.fail(&file.path, error),
            }
        }

        log_failures("roll back", &report);
        reparse(tree, &report);
        Ok(report)
    }
}

/// One plan per file with matches at or below `root`, in tree order.
fn plan_files(
    tree: &SourceTree,
    root: NodeId,
    matcher: &Matcher,
    replacement: &str,
) -> Result<Vec<FilePlan>, EditError> {
    let mut groups: Vec<(usize, Vec<Match>)> = Vec::new();
    for m in find_all(tree, root, matcher) {
        let NodeId::Unit { file, .. } = m.node else {
            continue;
        };
        match groups.iter_mut().find(|(idx, _)| *idx == file) {
            Some((_, matches)) => matches.push(m),
            None => groups.push((file, vec![m])),
        }
    }

    let mut files = Vec::with_capacity(groups.len());
    for (idx, matches) in groups {
        let source = &tree.files()[idx];
        let mut edits = Vec::new();
        let mut replacements = Vec::with_capacity(matches.len());
        for m in &matches {
            let offset = source.line_offset(m.line).unwrap_or_default();
            let mut texts = Vec::with_capacity(m.spans.len());
            for &(start, end) in &m.spans {
                let text = matcher.expand(&m.text, (start, end), replacement);
                edits.push(Edit::new(offset + start, offset + end, text.clone(), &m.text[start..end]));
                texts.push(text);
            }
            replacements.push(texts);
        }

        let proposed = Edit::apply_all(source.text(), edits)?;
        debug!(
            path = %source.path().display(),
            matches = matches.len(),
            "planned file edit"
        );
        files.push(FilePlan {
            path: source.path().to_path_buf(),
            original: source.text().to_string(),
            fingerprint: EditVerification::fingerprint(source.text().as_bytes()),
            proposed,
            matches,
            replacements,
            status: FileStatus::Planned,
        });
    }
    Ok(files)
}

/// `root` as a node of `proposed`, the tree re-parsed from `base`'s planned text.
///
/// Nodes inside a re-parsed file are found again by their path below the file.
fn rebase_scope(
    base: &EditSession,
    tree: &SourceTree,
    proposed: &SourceTree,
    root: NodeId,
) -> Result<NodeId, EditError> {
    let NodeId::Unit { file, node } = root else {
        return Ok(root);
    };
    let file_root = NodeId::file_root(file);
    let rebased = base.files.iter().any(|f| f.path.as_path() == tree.path(root));
    if node == 0 || !rebased {
        return Ok(root);
    }

    let below: Vec<&str> = tree
        .track(root)
        .into_iter()
        .skip_while(|&id| id != file_root)
        .skip(1)
        .map(|id| tree.name(id))
        .collect();
    let missing = || EditError::ScopeNotFound {
        name: tree.absolute_name(root),
    };
    // Content nodes have no name to look up
    if below.iter().any(|name| name.is_empty()) {
        return Err(missing());
    }
    proposed
        .resolve_from(file_root, &below.join("."))
        .map_err(|_| missing())
}

/// Bring `tree` in line with the files `report` touched.
fn reparse(tree: &mut SourceTree, report: &EditReport) {
    for failure in tree.refresh(&report.successful) {
        warn!(path = %failure.path.display(), error = %failure.error, "failed to re-parse");
    }
}

fn log_failures(operation: &str, report: &EditReport) {
    for (path, error) in report.failed.iter().zip(&report.errors) {
        warn!(path = %path.display(), %error, "failed to {operation}");
    }
}
