use super::source_text;
use proptest::prelude::*;
use srctree::edit::EditSession;
use srctree::pattern::PatternSpec;
use srctree::tree::TreeBuilder;
use std::fs;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_delete_confirm_rollback_restores_bytes(text in source_text(), whole_word in any::<bool>()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated.py");
        fs::write(&path, &text).unwrap();

        let mut tree = TreeBuilder::new().build(dir.path()).unwrap();
        let matcher = PatternSpec::literal("token").whole_word(whole_word).compile().unwrap();
        let mut session = EditSession::plan_delete(&tree, tree.root(), &matcher).unwrap();

        let confirmed = session.confirm(&mut tree).unwrap();
        prop_assert!(confirmed.is_clean());
        if text.contains("token") {
            prop_assert!(!fs::read_to_string(&path).unwrap().contains("token"));
        }

        let rolled_back = session.rollback(&mut tree).unwrap();
        prop_assert!(rolled_back.is_clean());
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }
}
