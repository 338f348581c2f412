pub mod client;
pub mod error;
pub mod types;

pub use client::HttpGenerationService;
pub use error::ServiceError;
pub use types::{ItemAtual, PendingJob, StepResult};

use std::future::Future;

/// Remote collaborator that performs the actual generation, one unit per step.
///
/// `advance` is self-tracking: the server decides which unit comes next, so
/// the caller never passes an index and a blind retry of a failed call is
/// safe.
pub trait GenerationService: Send + Sync {
    /// Generates the next unit of `job_id` and returns the updated counters.
    fn advance(&self, job_id: &str)
    -> impl Future<Output = Result<StepResult, ServiceError>> + Send;

    /// Asks the server to stop `job_id`. Best effort.
    fn cancel(&self, job_id: &str) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Jobs left incomplete for `user_id`, from any device.
    fn list_pending(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<PendingJob>, ServiceError>> + Send;
}
