//! Text projections of matches, planned edits and tree outlines.
//!
//! Nothing here touches the tree or the filesystem; every function takes
//! its display settings explicitly.

use crate::edit::EditSession;
use crate::search::Match;
use crate::tree::{NodeId, NodeKind, SourceTree};
use colored::Colorize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    /// ANSI colors for a dark terminal background
    #[default]
    Dark,
    /// Plain text; matches marked as `<match>`, replacements as `<old/new>`
    NoColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayParams {
    pub color_scheme: ColorScheme,
    pub line_numbers: bool,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Dark,
            line_numbers: true,
        }
    }
}

impl DisplayParams {
    pub fn plain() -> Self {
        Self {
            color_scheme: ColorScheme::NoColor,
            ..Self::default()
        }
    }

    fn location(&self, m: &Match) -> String {
        let path = m.file.display().to_string();
        let location = if self.line_numbers {
            format!("{path}:{}", m.line)
        } else {
            path
        };
        match self.color_scheme {
            ColorScheme::Dark => location.cyan().to_string(),
            ColorScheme::NoColor => location,
        }
    }

    fn owner(&self, m: &Match) -> String {
        match self.color_scheme {
            ColorScheme::Dark => m.owner.dimmed().to_string(),
            ColorScheme::NoColor => m.owner.clone(),
        }
    }
}

/// Rebuild `text` with each span replaced by `mark(index, matched)`.
fn splice_spans(text: &str, spans: &[(usize, usize)], mut mark: impl FnMut(usize, &str) -> String) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 8);
    let mut cursor = 0;
    for (idx, &(start, end)) in spans.iter().enumerate() {
        out.push_str(&text[cursor..start]);
        out.push_str(&mark(idx, &text[start..end]));
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// One match as `<path>:<line>: '<marked line>' (<owner>)`.
pub fn render_match(m: &Match, params: &DisplayParams) -> String {
    let marked = match params.color_scheme {
        ColorScheme::NoColor => m.marked("<", ">"),
        ColorScheme::Dark => splice_spans(&m.text, &m.spans, |_, matched| {
            matched.black().on_bright_white().to_string()
        }),
    };
    if m.owner.is_empty() {
        format!("{}: '{}'", params.location(m), marked)
    } else {
        format!("{}: '{}' ({})", params.location(m), marked, params.owner(m))
    }
}

pub fn render_matches(matches: &[Match], params: &DisplayParams) -> String {
    matches
        .iter()
        .map(|m| render_match(m, params) + "\n")
        .collect()
}

/// One match with each span shown as old and new text.
pub fn render_replacement(m: &Match, replacements: &[String], params: &DisplayParams) -> String {
    let marked = splice_spans(&m.text, &m.spans, |idx, old| {
        let new = replacements.get(idx).map(String::as_str).unwrap_or("");
        match params.color_scheme {
            ColorScheme::NoColor => format!("<{old}/{new}>"),
            ColorScheme::Dark => format!("{}{}", old.red().strikethrough(), new.green()),
        }
    });
    format!("{}: '{}'", params.location(m), marked)
}

/// Every planned change in `session`, one line per matched line.
pub fn render_plan(session: &EditSession, params: &DisplayParams) -> String {
    let mut out = String::new();
    for file in session.files() {
        for (m, replacements) in file.matches().iter().zip(file.replacements()) {
            out.push_str(&render_replacement(m, replacements, params));
            out.push('\n');
        }
    }
    out
}

/// Indented listing of the named nodes at or below `root`.
pub fn render_outline(tree: &SourceTree, root: NodeId, params: &DisplayParams) -> String {
    let base = tree.track(root).len();
    let mut out = String::new();

    for node in tree.descendants(root) {
        if node.kind() == NodeKind::Content {
            continue;
        }
        let depth = tree.track(node.id()).len() - base;
        let kind = node.kind().to_string();
        let kind = match params.color_scheme {
            ColorScheme::Dark => kind.blue().to_string(),
            ColorScheme::NoColor => kind,
        };
        let name = match node.kind() {
            NodeKind::Directory | NodeKind::File if node.name().is_empty() => "<text>",
            _ => node.name(),
        };

        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{kind} {name}"));
        if params.line_numbers {
            if let Some(span) = node.span().filter(|_| node.kind().is_structural()) {
                out.push_str(&format!(" ({span})"));
            }
        }
        out.push('\n');
    }
    out
}
