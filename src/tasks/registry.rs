use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::store::{KeyValueStore, TASKS_KEY, load_json, save_json};

use super::notification::Notification;
use super::task::{NewTask, Task, TaskStatus, TaskUpdate};

/// How many of the most recent tasks are kept, in memory and on disk.
pub const DEFAULT_TASK_HISTORY: usize = 10;

/// Durable store of background-operation records.
///
/// Tasks are kept most-recent-first and capped. Loading reclassifies every
/// live task as [`TaskStatus::Interrupted`]: the process that owned it is
/// gone, so nothing can still be executing it.
pub struct TaskRegistry {
    store: Arc<dyn KeyValueStore>,
    tasks: Vec<Task>,
    cap: usize,
    identity: Option<String>,
    notifier: Option<UnboundedSender<Notification>>,
}

impl TaskRegistry {
    /// Loads the persisted list and recovers tasks left live by a previous process.
    pub fn load(store: Arc<dyn KeyValueStore>, cap: usize) -> Result<Self, EngineError> {
        let cap = cap.max(1);
        let mut tasks: Vec<Task> = load_json(store.as_ref(), TASKS_KEY)?.unwrap_or_default();
        tasks.truncate(cap);

        let mut recovered = 0usize;
        for task in tasks.iter_mut().filter(|t| t.status.is_live()) {
            task.status = TaskStatus::Interrupted;
            recovered += 1;
        }

        let registry = Self {
            store,
            tasks,
            cap,
            identity: None,
            notifier: None,
        };
        if recovered > 0 {
            info!(recovered, "marked tasks from a previous run as interrupted");
            registry.persist()?;
        }
        Ok(registry)
    }

    /// Routes resume prompts to `notifier` in addition to returning them.
    pub fn with_notifier(mut self, notifier: UnboundedSender<Notification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Creates a task and returns its id. Only live statuses are accepted.
    pub fn add_task(&mut self, data: NewTask, status: TaskStatus) -> Result<String, EngineError> {
        if !status.is_live() {
            return Err(EngineError::InvalidInitialStatus(status));
        }
        let task = Task::create(data, status, Utc::now());
        let id = task.id.clone();
        debug!(task_id = %id, kind = %task.kind, %status, "task added");
        self.tasks.insert(0, task);
        self.tasks.truncate(self.cap);
        self.persist()?;
        Ok(id)
    }

    /// Merges `update` into the task.
    ///
    /// A pending task may start running and a live task may finish. Anything
    /// else is rejected: `Interrupted` can't be set by callers, a running task
    /// never goes back to pending, and a completed or failed task keeps its
    /// status forever.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<(), EngineError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))?;

        if let Some(to) = update.status {
            let from = task.status;
            let allowed = from == to
                || (from == TaskStatus::Pending && to == TaskStatus::Running)
                || (from.is_live() && to.is_terminal());
            if !allowed {
                return Err(EngineError::InvalidTransition { from, to });
            }
        }

        task.apply(update, Utc::now());
        self.persist()
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Option<Task>, EngineError> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        let task = self.tasks.remove(pos);
        self.persist()?;
        Ok(Some(task))
    }

    pub fn get_task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// All tasks, most recent first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Running)
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.tasks
            .iter()
            .any(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Interrupted))
    }

    pub fn has_running_tasks(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Running)
    }

    /// Marks a live task as interrupted because its owner stopped it without
    /// finishing, e.g. the generation job behind it was paused. Unlike
    /// [`update_task`](Self::update_task) this is meant for the owner only.
    pub fn interrupt(&mut self, id: &str) -> Result<(), EngineError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))?;
        if !task.status.is_live() {
            return Err(EngineError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Interrupted,
            });
        }
        task.status = TaskStatus::Interrupted;
        debug!(task_id = %id, "task interrupted by its owner");
        self.persist()
    }

    /// Removes an interrupted task and hands it back so the caller can
    /// re-create the operation from its `config`.
    pub fn take_interrupted(&mut self, id: &str) -> Result<Task, EngineError> {
        let task = self
            .get_task_by_id(id)
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))?;
        if task.status != TaskStatus::Interrupted {
            return Err(EngineError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Running,
            });
        }
        self.remove_task(id)?
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))
    }

    /// Drops completed and failed tasks, returning how many were removed.
    pub fn clear_finished(&mut self) -> Result<usize, EngineError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.status.is_terminal());
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Records that the user's identity is known.
    ///
    /// Only the first call counts: it emits one resume prompt per interrupted
    /// task. Later calls emit nothing.
    pub fn identify(&mut self, user_id: &str) -> Vec<Notification> {
        if self.identity.is_some() {
            return Vec::new();
        }
        self.identity = Some(user_id.to_string());

        let prompts: Vec<Notification> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Interrupted)
            .map(Notification::resume_prompt)
            .collect();

        for prompt in &prompts {
            if let Some(tx) = &self.notifier
                && tx.send(prompt.clone()).is_err()
            {
                warn!(task_id = %prompt.payload.task_id, "notification receiver dropped");
            }
        }
        if !prompts.is_empty() {
            info!(user_id, count = prompts.len(), "raised resume prompts for interrupted tasks");
        }
        prompts
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    fn persist(&self) -> Result<(), EngineError> {
        save_json(self.store.as_ref(), TASKS_KEY, &self.tasks)
    }
}
