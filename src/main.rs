use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use srctree::config::{self, EngineConfig};
use srctree::edit::{EditSession, FilePlan};
use srctree::pattern::{Matcher, PatternSpec};
use srctree::render::{self, ColorScheme, DisplayParams};
use srctree::search::find_all;
use srctree::tree::{group_imports, ImportField, NodeId, SourceTree};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srctree")]
#[command(about = "Structural search and edit for Python-like source trees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (otherwise srctree.toml is looked up from the target path)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log engine steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every line matching a pattern, with its owning node
    Find {
        #[command(flatten)]
        pattern: PatternArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Emit matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace matches of a pattern
    Replace {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Replacement text; `$1` / `${name}` refer to capture groups with --regex
        replacement: String,

        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        edit: EditArgs,
    },

    /// Delete matches of a pattern
    Delete {
        #[command(flatten)]
        pattern: PatternArgs,

        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        edit: EditArgs,
    },

    /// Print the class and function structure of a tree
    Outline {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// List import statements, optionally grouped
    Imports {
        /// Group by these fields, outermost first (repeatable)
        #[arg(long = "group-by", value_enum, value_name = "FIELD")]
        group_by: Vec<GroupField>,

        #[command(flatten)]
        tree: TreeArgs,

        /// Emit imports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one node's source, located by dotted path
    Show {
        /// Node path such as `pkg.module.Class.method`
        node: String,

        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupField {
    Module,
    From,
    Name,
    Alias,
    TypeChecking,
}

impl From<GroupField> for ImportField {
    fn from(field: GroupField) -> Self {
        match field {
            GroupField::Module => ImportField::Module,
            GroupField::From => ImportField::From,
            GroupField::Name => ImportField::Name,
            GroupField::Alias => ImportField::Alias,
            GroupField::TypeChecking => ImportField::TypeChecking,
        }
    }
}

#[derive(Args)]
struct PatternArgs {
    /// Pattern to search for (literal unless --regex)
    pattern: String,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    regex: bool,

    /// Only match whole words
    #[arg(short = 'w', long)]
    whole_word: bool,

    /// Match case-insensitively
    #[arg(short = 'i', long)]
    ignore_case: bool,
}

impl PatternArgs {
    fn compile(&self) -> Result<Matcher> {
        let spec = if self.regex {
            PatternSpec::regex(&self.pattern)
        } else {
            PatternSpec::literal(&self.pattern)
        };
        Ok(spec
            .whole_word(self.whole_word)
            .case_sensitive(!self.ignore_case)
            .compile()?)
    }
}

#[derive(Args)]
struct TreeArgs {
    /// File or directory to operate on
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Extra glob of paths to skip (repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Restrict to the subtree at this node path
    #[arg(long, value_name = "NODE")]
    within: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Args)]
struct EditArgs {
    /// Write the changes (otherwise only show what would change)
    #[arg(long)]
    apply: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,
}

/// A built tree plus the settings it was built with.
struct Workspace {
    config: EngineConfig,
    tree: SourceTree,
    scope: NodeId,
    params: DisplayParams,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // SRCTREE_LOG or RUST_LOG override; --verbose => debug; else warnings only
    let filter = EnvFilter::try_from_env("SRCTREE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(if cli.verbose {
                "srctree=debug"
            } else {
                "srctree=warn"
            })
        });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config_path = cli.config;
    match cli.command {
        Commands::Find {
            pattern,
            tree,
            json,
        } => cmd_find(config_path, &pattern, &tree, json),

        Commands::Replace {
            pattern,
            replacement,
            tree,
            edit,
        } => cmd_edit(config_path, &pattern, &replacement, &tree, &edit),

        Commands::Delete {
            pattern,
            tree,
            edit,
        } => cmd_edit(config_path, &pattern, "", &tree, &edit),

        Commands::Outline { tree } => cmd_outline(config_path, &tree),

        Commands::Show { node, tree } => cmd_show(config_path, &node, &tree),

        Commands::Imports {
            group_by,
            tree,
            json,
        } => cmd_imports(config_path, &group_by, &tree, json),
    }
}

fn open_workspace(config_path: Option<PathBuf>, args: &TreeArgs) -> Result<Workspace> {
    let config = config::load_for(config_path.as_deref(), &args.path)?;

    let mut builder = config.tree_builder()?;
    for glob in &args.ignore {
        builder = builder.add_ignore(glob.clone());
    }
    let tree = builder
        .build(&args.path)
        .with_context(|| format!("failed to build tree at {}", args.path.display()))?;

    for failure in tree.failures() {
        eprintln!(
            "{} {}: {}",
            "skipped".yellow(),
            failure.path.display(),
            failure.error
        );
    }

    let scope = match &args.within {
        Some(expr) => tree.resolve(expr)?,
        None => tree.root(),
    };

    let mut params = config.display_params();
    if args.no_color {
        params.color_scheme = ColorScheme::NoColor;
    }

    Ok(Workspace {
        config,
        tree,
        scope,
        params,
    })
}

fn cmd_find(config_path: Option<PathBuf>, pattern: &PatternArgs, args: &TreeArgs, json: bool) -> Result<()> {
    let matcher = pattern.compile()?;
    let ws = open_workspace(config_path, args)?;
    let matches = find_all(&ws.tree, ws.scope, &matcher);

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    print!("{}", render::render_matches(&matches, &ws.params));
    let files = {
        let mut paths: Vec<_> = matches.iter().map(|m| &m.file).collect();
        paths.dedup();
        paths.len()
    };
    eprintln!(
        "{} matches in {} files",
        format!("{}", matches.len()).green(),
        files
    );
    Ok(())
}

fn cmd_edit(
    config_path: Option<PathBuf>,
    pattern: &PatternArgs,
    replacement: &str,
    args: &TreeArgs,
    edit: &EditArgs,
) -> Result<()> {
    let matcher = pattern.compile()?;
    let mut ws = open_workspace(config_path, args)?;

    let mut session =
        EditSession::plan(&ws.tree, ws.scope, &matcher, replacement)?.with_mode(ws.config.write_mode());
    if session.is_empty() {
        println!("{}", "No matches".yellow());
        return Ok(());
    }

    if edit.diff {
        for file in session.files() {
            display_diff(file, ws.params.color_scheme);
        }
    } else {
        print!("{}", render::render_plan(&session, &ws.params));
    }

    if !edit.apply {
        println!(
            "\n{}",
            format!(
                "[DRY RUN] {} matches in {} files; pass --apply to write",
                session.match_count(),
                session.files().len()
            )
            .cyan()
        );
        return Ok(());
    }

    let report = session.confirm(&mut ws.tree)?;
    for path in &report.successful {
        println!("{} {}", "✓".green(), path.display());
    }
    for (path, error) in report.failed.iter().zip(&report.errors) {
        eprintln!("{} {}: {}", "✗".red(), path.display(), error);
    }

    println!();
    println!("Summary:");
    println!("  {} written", format!("{}", report.successful.len()).green());
    if !report.is_clean() {
        println!("  {} failed", format!("{}", report.failed.len()).red());
        anyhow::bail!("{} file(s) could not be written", report.failed.len());
    }
    Ok(())
}

fn cmd_outline(config_path: Option<PathBuf>, args: &TreeArgs) -> Result<()> {
    let ws = open_workspace(config_path, args)?;
    print!("{}", render::render_outline(&ws.tree, ws.scope, &ws.params));
    Ok(())
}

fn cmd_show(config_path: Option<PathBuf>, node: &str, args: &TreeArgs) -> Result<()> {
    let ws = open_workspace(config_path, args)?;
    let id = ws.tree.resolve_from(ws.scope, node)?;
    let node = ws.tree.node(id);

    let location = match node.span() {
        Some(span) => format!("{}:{}", node.path().display(), span),
        None => node.path().display().to_string(),
    };
    println!("{} {}  {}", node.kind(), node.absolute_name().bold(), location.dimmed());
    if let Some(doc) = ws.tree.docstring(id) {
        println!("{}", doc.italic());
    }
    println!();
    if let Some(text) = node.text() {
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn cmd_imports(config_path: Option<PathBuf>, group_by: &[GroupField], args: &TreeArgs, json: bool) -> Result<()> {
    let ws = open_workspace(config_path, args)?;
    let imports = ws.tree.imports(ws.scope);

    if json {
        println!("{}", serde_json::to_string_pretty(&imports)?);
        return Ok(());
    }

    let plain = ws.params.color_scheme == ColorScheme::NoColor;
    let fields: Vec<ImportField> = group_by.iter().map(|&f| f.into()).collect();
    for (key, group) in group_imports(&imports, &fields) {
        let indent = if fields.is_empty() {
            ""
        } else {
            let label: Vec<&str> = key.iter().map(|v| v.as_deref().unwrap_or("-")).collect();
            let label = label.join(" / ");
            println!("{}", if plain { label.normal() } else { label.bold() });
            "  "
        };
        for import in group {
            let guard = match (import.type_checking, plain) {
                (false, _) => "".normal(),
                (true, true) => " [type checking]".normal(),
                (true, false) => " [type checking]".dimmed(),
            };
            println!("{indent}{}:{}: {import}{guard}", import.module, import.line);
        }
    }
    Ok(())
}

/// Helper: Show unified diff between original and planned content
fn display_diff(file: &FilePlan, scheme: ColorScheme) {
    if scheme == ColorScheme::NoColor {
        print!("{}", file.diff());
        return;
    }

    println!("\n{}", format!("--- {} (original)", file.path().display()).dimmed());
    println!("{}", format!("+++ {} (planned)", file.path().display()).dimmed());

    let diff = TextDiff::from_lines(file.original(), file.proposed());
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
