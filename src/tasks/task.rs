use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kinds of background operation a task can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SimuladoGeneration,
    QuestionGeneration,
    StudyPlanGeneration,
    QuestionImport,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::SimuladoGeneration => write!(f, "simulado_generation"),
            TaskKind::QuestionGeneration => write!(f, "question_generation"),
            TaskKind::StudyPlanGeneration => write!(f, "study_plan_generation"),
            TaskKind::QuestionImport => write!(f, "question_import"),
        }
    }
}

/// Lifecycle status of a task.
///
/// `Pending` and `Running` are live; `Completed` and `Failed` are terminal;
/// `Interrupted` is only ever assigned by the registry when it finds a live
/// status left over from a previous process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl TaskStatus {
    pub fn is_live(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// A background-operation record as persisted under the tasks key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque payload a caller needs to resume the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub progress: Option<u8>,
    pub config: Option<Value>,
}

impl NewTask {
    pub fn new(kind: TaskKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            progress: None,
            config: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }
}

/// Partial update merged into an existing task. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<u8>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub config: Option<Value>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }
}

impl Task {
    pub(crate) fn create(data: NewTask, status: TaskStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: data.kind,
            status,
            title: data.title,
            description: data.description,
            progress: data.progress.map(|p| p.min(100)),
            result: None,
            error: None,
            created_at: now,
            completed_at: if status.is_terminal() { Some(now) } else { None },
            config: data.config,
        }
    }

    /// Merges `update`, stamping `completed_at` when the status becomes terminal.
    pub(crate) fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            if status.is_terminal() && !self.status.is_terminal() {
                self.completed_at = Some(now);
            }
            self.status = status;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(progress) = update.progress {
            self.progress = Some(progress.min(100));
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(config) = update.config {
            self.config = Some(config);
        }
    }
}
