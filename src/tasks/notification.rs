use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::{Task, TaskKind};

/// Severity shown by the notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Warning,
}

/// Data needed to offer resuming an interrupted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePayload {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub config: Option<Value>,
}

/// A record handed to the external notification surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub payload: ResumePayload,
}

impl Notification {
    /// Resume prompt for a task found interrupted after a restart.
    pub fn resume_prompt(task: &Task) -> Self {
        Self {
            category: NotificationCategory::Warning,
            title: "Tarefa interrompida".to_string(),
            message: format!(
                "\"{}\" foi interrompida antes de terminar. Deseja retomar?",
                task.title
            ),
            payload: ResumePayload {
                task_id: task.id.clone(),
                kind: task.kind,
                config: task.config.clone(),
            },
        }
    }
}
