//! Flat comment list to ordered forest.

use std::collections::{HashMap, HashSet};

use crate::models::{CommentId, CommentNode, CommentRecord};

/// Build the reply forest for one board.
///
/// Roots and siblings keep their order from `records`. A record whose
/// `parent_id` does not resolve (including one pointing at itself) is kept as
/// a root and logged. Records trapped in a parent cycle are appended as roots
/// after the regular ones, so the returned forest always holds exactly
/// `records.len()` nodes.
pub fn build_tree(records: &[CommentRecord]) -> Vec<CommentNode> {
    let known: HashSet<CommentId> = records.iter().map(|r| r.id).collect();

    // Group child indexes by parent id, preserving input order
    let mut children_map: HashMap<CommentId, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match record.parent_id {
            Some(parent) if parent != record.id && known.contains(&parent) => {
                children_map.entry(parent).or_default().push(index);
            }
            Some(parent) => {
                tracing::warn!(
                    comment_id = record.id,
                    parent_id = parent,
                    "Comment references unknown parent, treating as root"
                );
                roots.push(index);
            }
            None => roots.push(index),
        }
    }

    let mut placed = vec![false; records.len()];
    let mut forest: Vec<CommentNode> = roots
        .iter()
        .map(|&index| build_subtree(index, records, &children_map, &mut placed))
        .collect();

    // Anything not reached from a root sits on a parent cycle
    for index in 0..records.len() {
        if !placed[index] {
            tracing::warn!(
                comment_id = records[index].id,
                "Comment is part of a parent cycle, treating as root"
            );
            forest.push(build_subtree(index, records, &children_map, &mut placed));
        }
    }

    forest
}

/// Assemble the subtree under `root` with an explicit stack. Nodes are
/// finished in post-order, so each one collects its already built children.
fn build_subtree(
    root: usize,
    records: &[CommentRecord],
    children_map: &HashMap<CommentId, Vec<usize>>,
    placed: &mut [bool],
) -> CommentNode {
    placed[root] = true;
    let mut assigned: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut built: HashMap<usize, CommentNode> = HashMap::new();
    let mut stack = vec![(root, false)];

    while let Some((index, expanded)) = stack.pop() {
        if expanded {
            let children = assigned
                .remove(&index)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|child| built.remove(&child))
                .collect();
            built.insert(
                index,
                CommentNode {
                    record: records[index].clone(),
                    children,
                },
            );
            continue;
        }

        let kids: Vec<usize> = children_map
            .get(&records[index].id)
            .map(|indexes| indexes.iter().copied().filter(|&c| !placed[c]).collect())
            .unwrap_or_default();
        for &kid in &kids {
            placed[kid] = true;
        }

        stack.push((index, true));
        stack.extend(kids.iter().rev().map(|&kid| (kid, false)));
        assigned.insert(index, kids);
    }

    built
        .remove(&root)
        .unwrap_or_else(|| CommentNode::leaf(records[root].clone()))
}

/// Total number of nodes in a forest.
pub fn count_nodes(forest: &[CommentNode]) -> usize {
    forest.iter().map(CommentNode::node_count).sum()
}

/// Find a node by id anywhere in the forest.
pub fn find_node(forest: &[CommentNode], id: CommentId) -> Option<&CommentNode> {
    forest
        .iter()
        .flat_map(CommentNode::walk)
        .map(|(node, _)| node)
        .find(|node| node.id() == id)
}

/// Serialize a forest as nested JSON without recursing per level.
///
/// The output has the same shape as serializing the nodes with serde: each
/// record's fields followed by its `children` array.
pub fn forest_to_json(forest: &[CommentNode]) -> serde_json::Result<String> {
    enum Step<'a> {
        Open(&'a CommentNode, bool),
        Close,
    }

    let mut out = String::from("[");
    let mut stack: Vec<Step<'_>> = forest
        .iter()
        .enumerate()
        .rev()
        .map(|(i, node)| Step::Open(node, i > 0))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Close => out.push_str("]}"),
            Step::Open(node, comma) => {
                if comma {
                    out.push(',');
                }
                let record = serde_json::to_string(&node.record)?;
                out.push_str(record.strip_suffix('}').unwrap_or(&record));
                out.push_str(",\"children\":[");
                stack.push(Step::Close);
                stack.extend(
                    node.children
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(i, child)| Step::Open(child, i > 0)),
                );
            }
        }
    }

    out.push(']');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: CommentId, parent_id: Option<CommentId>) -> CommentRecord {
        CommentRecord {
            id,
            board_id: 1,
            parent_id,
            author_id: "alice".to_string(),
            text: format!("comment {}", id),
            attached_files: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shape(forest: &[CommentNode]) -> Vec<(CommentId, Vec<CommentId>)> {
        forest
            .iter()
            .map(|n| (n.id(), n.children.iter().map(CommentNode::id).collect()))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn test_roots_and_one_reply() {
        let records = vec![record(1, None), record(2, Some(1)), record(3, None)];
        let forest = build_tree(&records);

        assert_eq!(shape(&forest), vec![(1, vec![2]), (3, vec![])]);
        assert!(forest[0].children[0].children.is_empty());
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let records = vec![
            record(10, None),
            record(5, Some(10)),
            record(7, Some(10)),
            record(6, Some(10)),
        ];
        let forest = build_tree(&records);
        assert_eq!(shape(&forest), vec![(10, vec![5, 7, 6])]);
    }

    #[test]
    fn test_child_listed_before_parent() {
        let records = vec![record(2, Some(1)), record(1, None)];
        let forest = build_tree(&records);
        assert_eq!(shape(&forest), vec![(1, vec![2])]);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let records = vec![record(1, None), record(2, Some(99))];
        let forest = build_tree(&records);
        assert_eq!(shape(&forest), vec![(1, vec![]), (2, vec![])]);
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let records = vec![record(4, Some(4))];
        let forest = build_tree(&records);
        assert_eq!(shape(&forest), vec![(4, vec![])]);
    }

    #[test]
    fn test_cycle_keeps_every_node() {
        let records = vec![record(1, None), record(2, Some(3)), record(3, Some(2))];
        let forest = build_tree(&records);
        assert_eq!(count_nodes(&forest), 3);
        assert_eq!(shape(&forest), vec![(1, vec![]), (2, vec![3])]);
    }

    #[test]
    fn test_preorder_matches_sibling_order() {
        let records = vec![
            record(1, None),
            record(2, Some(1)),
            record(3, Some(2)),
            record(4, Some(1)),
            record(5, None),
        ];
        let forest = build_tree(&records);
        let order: Vec<_> = forest
            .iter()
            .flat_map(CommentNode::walk)
            .map(|(n, depth)| (n.id(), depth))
            .collect();
        assert_eq!(order, vec![(1, 0), (2, 1), (3, 2), (4, 1), (5, 0)]);
        assert_eq!(count_nodes(&forest), records.len());
    }

    #[test]
    fn test_idempotent() {
        let records = vec![record(1, None), record(2, Some(1)), record(3, Some(2))];
        assert_eq!(build_tree(&records), build_tree(&records));
    }

    #[test]
    fn test_find_node() {
        let records = vec![record(1, None), record(2, Some(1)), record(3, Some(2))];
        let forest = build_tree(&records);
        assert_eq!(find_node(&forest, 3).map(CommentNode::id), Some(3));
        assert!(find_node(&forest, 42).is_none());
    }

    fn chain(len: i64) -> Vec<CommentRecord> {
        (1..=len)
            .map(|id| record(id, if id == 1 { None } else { Some(id - 1) }))
            .collect()
    }

    #[test]
    fn test_deep_reply_chain() {
        let forest = build_tree(&chain(100_000));

        assert_eq!(forest.len(), 1);
        assert_eq!(count_nodes(&forest), 100_000);
        let deepest = forest[0].walk().last().expect("chain has nodes");
        assert_eq!(deepest.0.id(), 100_000);
        assert_eq!(deepest.1, 99_999);
        assert!(find_node(&forest, 50_000).is_some());
    }

    #[test]
    fn test_json_matches_serde_shape() {
        let records = vec![
            record(1, None),
            record(2, Some(1)),
            record(3, Some(2)),
            record(4, Some(1)),
            record(5, None),
        ];
        let forest = build_tree(&records);

        let written = forest_to_json(&forest).unwrap();
        let expected = serde_json::to_string(&forest).unwrap();
        assert_eq!(written, expected);
        assert_eq!(forest_to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_json_for_deep_chain() {
        let forest = build_tree(&chain(100_000));

        let json = forest_to_json(&forest).unwrap();

        assert!(json.starts_with("[{\"id\":1,"));
        assert_eq!(json.matches("\"children\":[").count(), 100_000);
        assert!(json.ends_with("]}]"));
    }
}
