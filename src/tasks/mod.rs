mod notification;
mod registry;
mod task;

pub use notification::{Notification, NotificationCategory, ResumePayload};
pub use registry::{DEFAULT_TASK_HISTORY, TaskRegistry};
pub use task::{NewTask, Task, TaskKind, TaskStatus, TaskUpdate};
