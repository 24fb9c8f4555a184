//! Subtree-wide operations: toggle and delete a task with all descendants.
//!
//! Subtrees are resolved with a recursive CTE over `parent_id`. The CTE uses
//! `UNION` rather than `UNION ALL`, so even a table corrupted into a cycle
//! yields each id once and the walk terminates.

use super::tasks::require_task;
use super::{Database, now_ms};
use crate::error::TaskResult;
use crate::types::TaskId;
use rusqlite::{Connection, params};
use tracing::info;

const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
        SELECT ?1
        UNION
        SELECT t.id FROM todos t INNER JOIN subtree s ON t.parent_id = s.id
    )";

/// Outcome of a cascading toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Value written to the task and all descendants.
    pub completed: bool,
    /// Number of rows updated, the task itself included.
    pub affected: usize,
}

/// Ids strictly below `task_id`, using an existing connection.
pub(crate) fn descendant_ids_internal(conn: &Connection, task_id: TaskId) -> TaskResult<Vec<TaskId>> {
    let mut stmt = conn.prepare(&format!(
        "{} SELECT id FROM subtree WHERE id != ?1 ORDER BY id",
        SUBTREE_CTE
    ))?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<TaskId>>>()?;
    Ok(ids)
}

impl Database {
    /// All descendants of a task (children, grandchildren, ...), ordered by id.
    pub fn descendant_ids(&self, task_id: TaskId) -> TaskResult<Vec<TaskId>> {
        self.with_conn(|conn| {
            require_task(conn, task_id)?;
            descendant_ids_internal(conn, task_id)
        })
    }

    /// Set `completed` on a task and every descendant.
    ///
    /// Without an explicit `target` the new value is the inverse of the
    /// task's current state, so checking a parent checks the whole subtree
    /// and unchecking it unchecks the whole subtree.
    pub fn toggle_with_children(
        &self,
        task_id: TaskId,
        target: Option<bool>,
    ) -> TaskResult<ToggleOutcome> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let task = require_task(&tx, task_id)?;
            let completed = target.unwrap_or(!task.completed);

            let affected = tx.execute(
                &format!(
                    "{} UPDATE todos SET completed = ?2, updated_at = ?3
                     WHERE id IN (SELECT id FROM subtree)",
                    SUBTREE_CTE
                ),
                params![task_id, completed, now],
            )?;
            tx.commit()?;

            info!(task_id, completed, affected, "Subtree toggled");
            Ok(ToggleOutcome {
                completed,
                affected,
            })
        })
    }

    /// Remove a task and its full subtree in one transaction.
    ///
    /// Returns the number of tasks removed.
    pub fn delete_with_descendants(&self, task_id: TaskId) -> TaskResult<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;

            let mut ids = descendant_ids_internal(&tx, task_id)?;
            ids.push(task_id);

            // Links are cut before deleting so the foreign-key cascade never
            // recurses level by level; SQLite caps trigger depth at 1000.
            {
                let mut detach = tx.prepare("UPDATE todos SET parent_id = NULL WHERE id = ?1")?;
                for id in &ids {
                    detach.execute(params![id])?;
                }
                let mut delete = tx.prepare("DELETE FROM todos WHERE id = ?1")?;
                for id in &ids {
                    delete.execute(params![id])?;
                }
            }
            tx.commit()?;
            let removed = ids.len();

            info!(task_id, removed, "Subtree deleted");
            Ok(removed)
        })
    }
}
