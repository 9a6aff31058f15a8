use super::source_text;
use proptest::prelude::*;
use srctree::pattern::PatternSpec;
use srctree::search::find_all;
use srctree::tree::{LineSpan, NodeId, SourceTree};

/// Children of `id` must tile its span with no gaps or overlaps.
fn assert_partitioned(tree: &SourceTree, id: NodeId) -> Result<(), TestCaseError> {
    let Some(span) = tree.span(id) else {
        return Ok(());
    };
    let children: Vec<NodeId> = tree.children(id).collect();
    if children.is_empty() {
        return Ok(());
    }

    let mut next = span.start;
    for &child in &children {
        let child_span = tree.span(child).unwrap_or_else(LineSpan::empty);
        if child_span.is_empty() {
            prop_assert_eq!(children.len(), 1, "empty child beside others");
            continue;
        }
        prop_assert_eq!(child_span.start, next, "gap or overlap before {}", child_span);
        next = child_span.end + 1;
        assert_partitioned(tree, child)?;
    }
    if !span.is_empty() {
        prop_assert_eq!(next, span.end + 1, "children stop short of {}", span);
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_children_partition_every_span(text in source_text()) {
        let tree = SourceTree::from_text(&text);
        let file = &tree.files()[0];
        let root_span = tree.span(tree.root()).unwrap();

        prop_assert_eq!(root_span.len(), file.line_count());
        prop_assert!(tree.children(tree.root()).next().is_some());
        assert_partitioned(&tree, tree.root())?;
    }

    #[test]
    fn test_every_line_scanned_once(text in source_text()) {
        let tree = SourceTree::from_text(&text);
        let any_char = PatternSpec::regex(".").compile().unwrap();

        let lines: Vec<usize> = find_all(&tree, tree.root(), &any_char)
            .iter()
            .map(|m| m.line)
            .collect();
        let non_empty = text.lines().filter(|l| !l.is_empty()).count();
        prop_assert_eq!(lines.len(), non_empty);

        let mut sorted = lines.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), lines.len());
    }

    #[test]
    fn test_node_text_matches_span(text in source_text()) {
        let tree = SourceTree::from_text(&text);
        let file = &tree.files()[0];

        for node in tree.iter() {
            if let (Some(span), Some(node_text)) = (node.span(), node.text()) {
                prop_assert_eq!(node_text, file.slice(span));
            }
        }
        prop_assert_eq!(tree.text(tree.root()).unwrap_or(""), text.as_str());
    }
}
