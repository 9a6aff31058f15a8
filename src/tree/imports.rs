//! Import statements of parsed files.
//!
//! Statements are read from logical lines, so bracketed and backslash
//! continued imports count once, at the line they start on. Imports under
//! an `if TYPE_CHECKING:` guard are kept but flagged; an `else:` branch of
//! the guard is ordinary code.

use crate::tree::node::NodeId;
use crate::tree::parser::{split_lines, strip_bom};
use crate::tree::scanner::{classify, LineKind};
use crate::tree::{SourceFile, SourceTree};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^import\s+(.+)$").expect("import regex is valid"));

static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^from\s+([.\w]+)\s+import\s+(.+)$").expect("from-import regex is valid")
});

static IMPORTED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([.\w]+|\*)(?:\s+as\s+(\w+))?$").expect("imported name regex is valid")
});

static TYPE_CHECKING_GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^if\s+(?:typing\.)?TYPE_CHECKING\s*:\s*(.*)$").expect("guard regex is valid")
});

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// Absolute name of the importing file
    pub module: String,
    /// Source module of a `from` import, leading dots kept
    pub from: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    /// Imported only under `if TYPE_CHECKING:`
    pub type_checking: bool,
    /// 1-based line the statement starts on
    pub line: usize,
}

impl Import {
    /// The name this import binds in the importing module.
    pub fn bound_name(&self) -> &str {
        match (&self.alias, &self.from) {
            (Some(alias), _) => alias,
            (None, Some(_)) => &self.name,
            (None, None) => self.name.split('.').next().unwrap_or(&self.name),
        }
    }

    /// Value of `field`, as used for grouping.
    pub fn field(&self, field: ImportField) -> Option<String> {
        match field {
            ImportField::Module => Some(self.module.clone()),
            ImportField::From => self.from.clone(),
            ImportField::Name => Some(self.name.clone()),
            ImportField::Alias => self.alias.clone(),
            ImportField::TypeChecking => Some(self.type_checking.to_string()),
        }
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(from) = &self.from {
            write!(f, "from {from} ")?;
        }
        write!(f, "import {}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    Module,
    From,
    Name,
    Alias,
    TypeChecking,
}

/// Imports keyed by their values of the grouping fields, in field order.
pub type ImportGroups<'a> = BTreeMap<Vec<Option<String>>, Vec<&'a Import>>;

/// Group `imports` by `fields`. With no fields everything lands under the empty key.
pub fn group_imports<'a>(imports: &'a [Import], fields: &[ImportField]) -> ImportGroups<'a> {
    let mut groups = ImportGroups::new();
    for import in imports {
        let key = fields.iter().map(|&field| import.field(field)).collect();
        groups.entry(key).or_default().push(import);
    }
    groups
}

impl SourceTree {
    /// Imports made at or below `id`.
    ///
    /// A directory collects its structured files in pre-order; a node inside
    /// a file keeps the statements that start within its span.
    pub fn imports(&self, id: NodeId) -> Vec<Import> {
        let files = match id {
            NodeId::Dir(d) => self.files_below(d),
            NodeId::Unit { file, .. } => vec![file],
        };
        let span = self.span(id);

        let mut imports = Vec::new();
        for file in files {
            let source = &self.files[file];
            if !source.is_structured() {
                continue;
            }
            let module = self.absolute_name(NodeId::file_root(file));
            imports.extend(
                file_imports(&module, source)
                    .into_iter()
                    .filter(|import| span.map_or(true, |s| s.contains(import.line))),
            );
        }
        imports
    }

    fn files_below(&self, dir: usize) -> Vec<usize> {
        let mut files = Vec::new();
        let mut stack = vec![NodeId::Dir(dir)];
        while let Some(id) = stack.pop() {
            match id {
                NodeId::Dir(d) => stack.extend(self.dirs[d].children.iter().rev().copied()),
                NodeId::Unit { file, .. } => files.push(file),
            }
        }
        files
    }
}

/// A logical line: its first line number, indentation and joined text.
struct Statement {
    line: usize,
    indent: usize,
    text: String,
}

fn statements(text: &str) -> Vec<Statement> {
    let mut lines: Vec<&str> = split_lines(text).collect();
    if let Some(first) = lines.first_mut() {
        *first = strip_bom(first);
    }
    let kinds = classify(lines.iter().copied());

    let mut statements = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let LineKind::Code { indent } = kinds[idx] else {
            idx += 1;
            continue;
        };
        let start = idx;
        let mut joined = strip_comment(lines[idx]).trim().to_string();
        idx += 1;
        while idx < lines.len() && (kinds[idx] == LineKind::Continuation || joined.ends_with('\\')) {
            if joined.ends_with('\\') {
                joined.pop();
            }
            joined.push(' ');
            joined.push_str(strip_comment(lines[idx]).trim());
            idx += 1;
        }
        statements.push(Statement {
            line: start + 1,
            indent,
            text: joined,
        });
    }
    statements
}

fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |idx| &line[..idx])
}

fn file_imports(module: &str, file: &SourceFile) -> Vec<Import> {
    let mut imports = Vec::new();
    // Indentation of the open TYPE_CHECKING guard
    let mut guard: Option<usize> = None;

    for statement in statements(file.text()) {
        if guard.is_some_and(|level| statement.indent <= level) {
            guard = None;
        }

        let mut body = statement.text.as_str();
        let mut type_checking = guard.is_some();
        if let Some(caps) = TYPE_CHECKING_GUARD.captures(&statement.text) {
            guard.get_or_insert(statement.indent);
            body = caps.get(1).map_or("", |m| m.as_str());
            type_checking = true;
        }

        for part in body.split(';') {
            for (from, name, alias) in parse_import(part.trim()) {
                imports.push(Import {
                    module: module.to_string(),
                    from: from.map(str::to_string),
                    name: name.to_string(),
                    alias: alias.map(str::to_string),
                    type_checking,
                    line: statement.line,
                });
            }
        }
    }
    imports
}

/// `(from, name, alias)` for each name imported by one simple statement.
fn parse_import(statement: &str) -> Vec<(Option<&str>, &str, Option<&str>)> {
    let (from, names) = if let Some(caps) = FROM_IMPORT.captures(statement) {
        (caps.get(1).map(|m| m.as_str()), caps.get(2))
    } else if let Some(caps) = IMPORT.captures(statement) {
        (None, caps.get(1))
    } else {
        return Vec::new();
    };
    let Some(names) = names else {
        return Vec::new();
    };

    names
        .as_str()
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| IMPORTED_NAME.captures(name))
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            Some((from, name, caps.get(2).map(|m| m.as_str())))
        })
        .collect()
}
