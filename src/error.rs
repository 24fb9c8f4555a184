//! Structured error types for task operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // Integrity errors
    ParentNotFound,
    ParentCycle,

    // Internal errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Whether the caller can fix the request and retry (validation or integrity).
    pub fn is_user_error(self) -> bool {
        matches!(
            self,
            ErrorCode::MissingRequiredField
                | ErrorCode::InvalidFieldValue
                | ErrorCode::ParentNotFound
                | ErrorCode::ParentCycle
        )
    }
}

/// Structured error for task operations.
#[derive(Debug, Serialize)]
pub struct TaskError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl TaskError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn parent_not_found(parent_id: i64) -> Self {
        Self::new(
            ErrorCode::ParentNotFound,
            format!("Parent task not found: {}", parent_id),
        )
        .with_field("parent_id")
    }

    pub fn parent_cycle(task_id: i64, parent_id: i64) -> Self {
        Self::new(
            ErrorCode::ParentCycle,
            format!(
                "Moving task {} under {} would make it its own ancestor",
                task_id, parent_id
            ),
        )
        .with_field("parent_id")
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskError {}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        TaskError::database(err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to TaskError first
        match err.downcast::<TaskError>() {
            Ok(task_err) => task_err,
            Err(err) => TaskError::internal(err),
        }
    }
}

/// Result type for task operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_roundtrip_keeps_code() {
        let err: anyhow::Error = TaskError::task_not_found(7).into();
        let back = TaskError::from(err);
        assert_eq!(back.code, ErrorCode::TaskNotFound);
        assert_eq!(back.message, "Task not found: 7");
    }

    #[test]
    fn foreign_anyhow_becomes_internal() {
        let back = TaskError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(back.code, ErrorCode::InternalError);
    }

    #[test]
    fn serializes_screaming_code_and_skips_empty_field() {
        let json = serde_json::to_string(&TaskError::task_not_found(3)).unwrap();
        assert!(json.contains("\"TASK_NOT_FOUND\""));
        assert!(!json.contains("field"));

        let json = serde_json::to_string(&TaskError::missing_field("task")).unwrap();
        assert!(json.contains("\"field\":\"task\""));
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(ErrorCode::MissingRequiredField.is_user_error());
        assert!(ErrorCode::ParentCycle.is_user_error());
        assert!(!ErrorCode::TaskNotFound.is_user_error());
        assert!(!ErrorCode::DatabaseError.is_user_error());
    }
}
