//! Task CRUD operations.

use super::cascade::descendant_ids_internal;
use super::{Database, now_ms};
use crate::error::{TaskError, TaskResult};
use crate::types::{Task, TaskId, TaskStats};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

const TASK_COLUMNS: &str = "id, task, completed, parent_id, created_at, updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        text: row.get("task")?,
        completed: row.get("completed")?,
        parent_id: row.get("parent_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Trim task text and reject it when nothing is left.
pub fn normalize_text(text: &str) -> TaskResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::missing_field("task"));
    }
    Ok(trimmed.to_string())
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: TaskId) -> TaskResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM todos WHERE id = ?1", TASK_COLUMNS))?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Like [`get_task_internal`], but a missing task is an error.
pub(crate) fn require_task(conn: &Connection, task_id: TaskId) -> TaskResult<Task> {
    get_task_internal(conn, task_id)?.ok_or_else(|| TaskError::task_not_found(task_id))
}

fn task_exists(conn: &Connection, task_id: TaskId) -> TaskResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM todos WHERE id = ?1",
        params![task_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Database {
    /// Create a new task, optionally nested under `parent_id`.
    ///
    /// The parent must already exist, so a freshly created task can never
    /// close a cycle.
    pub fn create_task(&self, text: &str, parent_id: Option<TaskId>) -> TaskResult<Task> {
        let text = normalize_text(text)?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(parent_id) = parent_id {
                if !task_exists(&tx, parent_id)? {
                    return Err(TaskError::parent_not_found(parent_id));
                }
            }

            tx.execute(
                "INSERT INTO todos (task, completed, parent_id, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?3, ?3)",
                params![text, parent_id, now],
            )?;
            let id = tx.last_insert_rowid();
            let task = require_task(&tx, id)?;

            tx.commit()?;
            info!(task_id = id, parent_id = ?parent_id, "Task created");
            Ok(task)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: TaskId) -> TaskResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Get all tasks in insertion order.
    pub fn get_all_tasks(&self) -> TaskResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM todos ORDER BY created_at, id",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(count = tasks.len(), "Loaded all tasks");
            Ok(tasks)
        })
    }

    /// Get direct children of a task in insertion order.
    pub fn get_children(&self, parent_id: TaskId) -> TaskResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM todos WHERE parent_id = ?1 ORDER BY created_at, id",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map(params![parent_id], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Replace a task's text.
    pub fn update_task_text(&self, task_id: TaskId, text: &str) -> TaskResult<Task> {
        let text = normalize_text(text)?;
        let now = now_ms();

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE todos SET task = ?1, updated_at = ?2 WHERE id = ?3",
                params![text, now, task_id],
            )?;
            if updated == 0 {
                return Err(TaskError::task_not_found(task_id));
            }
            info!(task_id, "Task text updated");
            require_task(conn, task_id)
        })
    }

    /// Flip a single task's completed flag. Children are left untouched.
    pub fn toggle_task(&self, task_id: TaskId) -> TaskResult<Task> {
        let now = now_ms();

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE todos SET completed = NOT completed, updated_at = ?1 WHERE id = ?2",
                params![now, task_id],
            )?;
            if updated == 0 {
                return Err(TaskError::task_not_found(task_id));
            }
            let task = require_task(conn, task_id)?;
            info!(task_id, completed = task.completed, "Task toggled");
            Ok(task)
        })
    }

    /// Re-parent a task. `None` moves it to the top level.
    ///
    /// Rejects moving a task under itself or any of its descendants.
    pub fn move_task(&self, task_id: TaskId, new_parent: Option<TaskId>) -> TaskResult<Task> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;

            if let Some(parent_id) = new_parent {
                if parent_id == task_id {
                    return Err(TaskError::parent_cycle(task_id, parent_id));
                }
                if !task_exists(&tx, parent_id)? {
                    return Err(TaskError::parent_not_found(parent_id));
                }
                if descendant_ids_internal(&tx, task_id)?.contains(&parent_id) {
                    return Err(TaskError::parent_cycle(task_id, parent_id));
                }
            }

            tx.execute(
                "UPDATE todos SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![new_parent, now, task_id],
            )?;
            let task = require_task(&tx, task_id)?;
            tx.commit()?;

            info!(task_id, parent_id = ?new_parent, "Task moved");
            Ok(task)
        })
    }

    /// Delete a task together with its whole subtree.
    ///
    /// Returns the number of tasks removed.
    pub fn delete_task(&self, task_id: TaskId) -> TaskResult<usize> {
        self.delete_with_descendants(task_id)
    }

    /// Total and completed task counts.
    pub fn task_stats(&self) -> TaskResult<TaskStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0) FROM todos",
                [],
                |row| {
                    Ok(TaskStats {
                        total: row.get(0)?,
                        completed: row.get(1)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_trims() {
        assert_eq!(normalize_text("  Milk \n").unwrap(), "Milk");
    }

    #[test]
    fn normalize_text_rejects_blank() {
        let err = normalize_text("   ").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::MissingRequiredField);
        assert_eq!(err.field.as_deref(), Some("task"));
    }
}
