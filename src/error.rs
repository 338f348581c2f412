use thiserror::Error;

use crate::service::ServiceError;
use crate::tasks::TaskStatus;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("A generation job is already active")]
    JobAlreadyActive,

    #[error("No generation job is active")]
    NoActiveJob,

    #[error("Generation total must be at least 1")]
    InvalidTotal,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Tasks cannot be created as {0}")]
    InvalidInitialStatus(TaskStatus),

    #[error("Generation orchestrator has shut down")]
    OrchestratorClosed,

    #[error("Generation service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = EngineError::InvalidTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::Running,
        };
        assert_eq!(err.to_string(), "Invalid task transition: completed -> running");
    }

    #[test]
    fn service_error_converts() {
        let err: EngineError = ServiceError::Unavailable("offline".into()).into();
        assert!(matches!(err, EngineError::Service(_)));
    }
}
