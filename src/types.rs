//! Core types for TaskNest.

use serde::{Deserialize, Serialize};

/// Task identifier as assigned by SQLite.
pub type TaskId = i64;

/// A single to-do record, possibly nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub parent_id: Option<TaskId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A task with its nested children (subtree).
///
/// Has no `Serialize` impl, since a derived one recurses once per level;
/// JSON output goes through [`crate::format::format_forest_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub task: Task,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.task.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of tasks below this node, at any depth.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&TaskNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Ids of this node and every descendant, in pre-order.
    pub fn subtree_ids(&self) -> Vec<TaskId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id());
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

impl Drop for TaskNode {
    // Unlink children iteratively so dropping a very deep chain does not
    // recurse once per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Ordered collection of root tasks and their descendants.
pub type Forest = Vec<TaskNode>;

/// Aggregate counts shown in the page header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
}

impl TaskStats {
    /// Counts for an already loaded set of records.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            total: tasks.len() as i64,
            completed: tasks.iter().filter(|t| t.completed).count() as i64,
        }
    }

    pub fn pending(&self) -> i64 {
        self.total - self.completed
    }
}
