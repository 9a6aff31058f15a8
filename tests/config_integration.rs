//! Integration tests for configuration-driven tree builds
//!
//! Tests encoding, property markers, include globs and copy mode loaded
//! from srctree.toml

use srctree::config::{discover, load_from_path, ConfigError};
use srctree::edit::{EditSession, WriteMode};
use srctree::pattern::PatternSpec;
use srctree::search::find_all;
use srctree::tree::NodeKind;
use std::fs;
use tempfile::TempDir;

/// Helper to create a temp dir with a config and a few files
fn setup_test_workspace(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(dir.path().join("srctree.toml"), config).unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/model.py"),
        "class Model:\n    @lazy_property\n    def weights(self):\n        return load()\n\n    @property\n    def name(self):\n        return 'm'\n",
    )
    .unwrap();
    fs::write(dir.path().join("src/README.txt"), "Model docs\n").unwrap();

    dir
}

#[test]
fn test_custom_property_markers() {
    let dir = setup_test_workspace("property_markers = [\"lazy_property\"]\n");
    let config = load_from_path(discover(dir.path().join("src")).unwrap()).unwrap();
    let tree = config.tree_builder().unwrap().build(dir.path()).unwrap();

    let weights = tree.resolve("src.model.Model.weights").unwrap();
    let name = tree.resolve("src.model.Model.name").unwrap();
    assert_eq!(tree.kind(weights), NodeKind::Property);
    assert_eq!(tree.kind(name), NodeKind::Function);
    assert!(tree.is_method(name));
}

#[test]
fn test_include_adds_unstructured_files() {
    let dir = setup_test_workspace("include = [\"*.txt\"]\n");
    let config = load_from_path(dir.path().join("srctree.toml")).unwrap();
    let tree = config.tree_builder().unwrap().build(dir.path()).unwrap();

    let src = tree.resolve("src").unwrap();
    let readme = tree
        .children(src)
        .find(|&c| tree.name(c) == "README.txt")
        .unwrap();
    assert_eq!(tree.kind(readme), NodeKind::File);
    let children: Vec<_> = tree.children(readme).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(tree.kind(children[0]), NodeKind::Content);

    let matcher = PatternSpec::literal("Model").compile().unwrap();
    let files: Vec<_> = find_all(&tree, tree.root(), &matcher)
        .into_iter()
        .map(|m| m.file.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["README.txt", "model.py"]);
}

#[test]
fn test_ignore_from_config() {
    let dir = setup_test_workspace("ignore = [\"model.py\"]\n");
    fs::write(dir.path().join("src/keep.py"), "x = 1\n").unwrap();
    let config = load_from_path(dir.path().join("srctree.toml")).unwrap();
    let tree = config.tree_builder().unwrap().build(dir.path()).unwrap();

    assert!(tree.resolve("src.keep").is_ok());
    assert!(tree.resolve("src.model").is_err());
}

#[test]
fn test_latin1_round_trip() {
    let dir = setup_test_workspace("encoding = \"latin1\"\n");
    fs::write(dir.path().join("src/menu.py"), b"DISH = 'cr\xe8me br\xfbl\xe9e'\n").unwrap();
    let config = load_from_path(dir.path().join("srctree.toml")).unwrap();
    let mut tree = config.tree_builder().unwrap().build(dir.path()).unwrap();

    let matcher = PatternSpec::literal("crème").compile().unwrap();
    let mut session = EditSession::plan(&tree, tree.root(), &matcher, "café").unwrap();
    let report = session.confirm(&mut tree).unwrap();
    assert!(report.is_clean());
    assert!(tree.resolve("src.menu").is_ok());
    assert_eq!(
        fs::read(dir.path().join("src/menu.py")).unwrap(),
        b"DISH = 'caf\xe9 br\xfbl\xe9e'\n"
    );
}

#[test]
fn test_copy_mode_from_config() {
    let dir = setup_test_workspace("[edit]\noverwrite = false\n");
    let config = load_from_path(dir.path().join("srctree.toml")).unwrap();
    assert_eq!(config.write_mode(), WriteMode::Copy);
    let mut tree = config.tree_builder().unwrap().build(dir.path()).unwrap();

    let matcher = PatternSpec::literal("load()").compile().unwrap();
    let mut session = EditSession::plan(&tree, tree.root(), &matcher, "fetch()")
        .unwrap()
        .with_mode(config.write_mode());
    session.confirm(&mut tree).unwrap();

    let copy = dir.path().join("src/model_copy.py");
    assert!(fs::read_to_string(&copy).unwrap().contains("return fetch()"));
    assert!(fs::read_to_string(dir.path().join("src/model.py"))
        .unwrap()
        .contains("return load()"));

    session.rollback(&mut tree).unwrap();
    assert!(!copy.exists());
}

#[test]
fn test_invalid_config_reports_path() {
    let dir = setup_test_workspace("ignore = [\"[oops\"]\n");
    let err = load_from_path(dir.path().join("srctree.toml")).unwrap_err();

    assert!(matches!(err, ConfigError::Validation { .. }));
    assert_eq!(err.path(), Some(dir.path().join("srctree.toml").as_path()));
    assert!(err.to_string().contains("invalid entry '[oops' in 'ignore'"));
}
