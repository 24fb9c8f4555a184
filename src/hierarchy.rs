//! Assemble flat task records into an ordered forest.
//!
//! The parent/child relation is stored as an adjacency list (`parent_id`), so
//! every read rebuilds the tree from scratch: records are grouped into a
//! parent -> children map, then nodes are assembled bottom-up from an
//! explicit pre-order stack. Nothing here recurses, so nesting depth is
//! limited by memory only.

use crate::types::{Forest, Task, TaskId, TaskNode};
use std::collections::HashMap;
use tracing::debug;

/// Build the forest for a set of task records.
///
/// Roots are tasks without a parent. Siblings are ordered by creation time,
/// then id. Tasks whose parent is missing (and everything below them) are
/// left out of the result.
pub fn build_forest(tasks: Vec<Task>) -> Forest {
    let total = tasks.len();

    let mut by_parent: HashMap<Option<TaskId>, Vec<Task>> = HashMap::new();
    for task in tasks {
        by_parent.entry(task.parent_id).or_default().push(task);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|t| (t.created_at, t.id));
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    let root_ids: Vec<TaskId> = roots.iter().map(|t| t.id).collect();

    // Pre-order walk from the roots: (task, ids of its children in order).
    let mut order: Vec<(Task, Vec<TaskId>)> = Vec::with_capacity(total);
    let mut stack: Vec<Task> = roots.into_iter().rev().collect();
    while let Some(task) = stack.pop() {
        let children = by_parent.remove(&Some(task.id)).unwrap_or_default();
        let child_ids = children.iter().map(|t| t.id).collect();
        stack.extend(children.into_iter().rev());
        order.push((task, child_ids));
    }

    // Reverse pre-order visits every child before its parent.
    let mut built: HashMap<TaskId, TaskNode> = HashMap::with_capacity(order.len());
    for (task, child_ids) in order.into_iter().rev() {
        let mut node = TaskNode::new(task);
        node.children = child_ids
            .iter()
            .filter_map(|id| built.remove(id))
            .collect();
        built.insert(node.id(), node);
    }

    let forest: Forest = root_ids
        .iter()
        .filter_map(|id| built.remove(id))
        .collect();

    let placed: usize = forest.iter().map(|n| n.descendant_count() + 1).sum();
    if placed < total {
        debug!(dropped = total - placed, "Excluded orphaned tasks from forest");
    }

    forest
}

/// Pre-order iterator over a forest, yielding `(depth, node)`.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a TaskNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a TaskNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// Walk every node of the forest in display order. Roots have depth 0.
pub fn walk(forest: &[TaskNode]) -> Walk<'_> {
    Walk {
        stack: forest.iter().rev().map(|node| (0, node)).collect(),
    }
}

/// Find a node anywhere in the forest.
pub fn find(forest: &[TaskNode], id: TaskId) -> Option<&TaskNode> {
    walk(forest).map(|(_, node)| node).find(|node| node.id() == id)
}
