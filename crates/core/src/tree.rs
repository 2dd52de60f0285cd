//! Rebuilds a comment subtree from the flat record set returned by a path
//! prefix query.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::domain::comments::Comment;
use crate::types::comment_id::CommentId;

/// Links `records` into a tree under `root`.
///
/// `records` is the subtree of `root`, root included, in storage order.
/// Children keep that order. Records whose parent is not part of the set are
/// left unattached. If the root itself is missing from `records`, the fetched
/// `root` is returned with no children.
pub fn assemble(root: Comment, records: Vec<Comment>) -> Comment {
    let mut slots: Vec<Option<Comment>> = Vec::with_capacity(records.len());
    let mut index: HashMap<CommentId, usize> = HashMap::with_capacity(records.len());
    for mut record in records {
        if let Entry::Vacant(entry) = index.entry(record.id) {
            record.children = Vec::new();
            entry.insert(slots.len());
            slots.push(Some(record));
        }
    }

    let Some(&root_slot) = index.get(&root.id) else {
        return leaf(root);
    };

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    for (slot, record) in slots.iter().enumerate() {
        let Some(record) = record else { continue };
        let Some(parent_id) = record.parent_id else {
            continue;
        };
        if let Some(&parent_slot) = index.get(&parent_id) {
            if parent_slot != slot {
                children[parent_slot].push(slot);
            }
        }
    }

    // Pre-order walk from the root. A slot is claimed by the first parent that
    // reaches it, so cyclic parent links cannot loop or move a node twice.
    let mut order = Vec::with_capacity(slots.len());
    let mut claimed: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut seen = vec![false; slots.len()];
    let mut stack = vec![root_slot];
    seen[root_slot] = true;
    while let Some(slot) = stack.pop() {
        order.push(slot);
        for &child in &children[slot] {
            if !seen[child] {
                seen[child] = true;
                claimed[slot].push(child);
                stack.push(child);
            }
        }
    }

    // Reverse pre-order finishes every child before its parent.
    for &slot in order.iter().rev() {
        let linked: Vec<Comment> = claimed[slot]
            .iter()
            .filter_map(|&child| slots[child].take())
            .collect();
        if let Some(node) = slots[slot].as_mut() {
            node.children = linked;
        }
    }

    match slots[root_slot].take() {
        Some(tree) => tree,
        None => leaf(root),
    }
}

/// Number of comments in the tree, root included.
pub fn count_nodes(root: &Comment) -> usize {
    let mut total = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        total += 1;
        stack.extend(node.children.iter());
    }
    total
}

fn leaf(mut root: Comment) -> Comment {
    root.children = Vec::new();
    root
}
