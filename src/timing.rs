//! Pacing constants and the small arithmetic shared by the generation loop.
//!
//! [`Pacing`] holds every delay the orchestrator uses. The only invariant is
//! that the failure backoff is strictly longer than the normal inter-step
//! delay; the magnitudes themselves are tunable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::service::ServiceError;

/// Upper bound for a server-requested `retry-after` wait.
pub const MAX_RETRY_AFTER_MS: u64 = 60 * 60 * 1000;

/// Delays applied around generation steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Backpressure between two successful steps.
    pub step_delay_ms: u64,
    /// Wait before retrying a step that failed.
    pub retry_delay_ms: u64,
    /// Debounce between `start` and the first step.
    pub start_debounce_ms: u64,
    /// Debounce between `resume` and the next step.
    pub resume_debounce_ms: u64,
    /// How long after identity is known the server is asked for pending jobs.
    pub pending_check_delay_ms: u64,
    /// Average wall time of one step, used for the remaining-time estimate.
    pub seconds_per_step: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            step_delay_ms: 3000,
            retry_delay_ms: 5000,
            start_debounce_ms: 500,
            resume_debounce_ms: 500,
            pending_check_delay_ms: 2000,
            seconds_per_step: 8,
        }
    }
}

impl Pacing {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn start_debounce(&self) -> Duration {
        Duration::from_millis(self.start_debounce_ms)
    }

    pub fn resume_debounce(&self) -> Duration {
        Duration::from_millis(self.resume_debounce_ms)
    }

    pub fn pending_check_delay(&self) -> Duration {
        Duration::from_millis(self.pending_check_delay_ms)
    }

    /// Backoff for a failed step. A rate-limited response may stretch it
    /// but never shortens it below `retry_delay_ms`, and is capped at
    /// [`MAX_RETRY_AFTER_MS`].
    pub fn retry_delay_for(&self, err: &ServiceError) -> Duration {
        let ms = match err {
            ServiceError::RateLimited { retry_after_ms } => {
                self.retry_delay_ms
                    .max((*retry_after_ms).min(MAX_RETRY_AFTER_MS))
            }
            _ => self.retry_delay_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.retry_delay_ms <= self.step_delay_ms {
            return Err(EngineError::Config(format!(
                "retry_delay_ms ({}) must be greater than step_delay_ms ({})",
                self.retry_delay_ms, self.step_delay_ms
            )));
        }
        Ok(())
    }
}

/// Percentage of `done` over `total`, rounded, reaching 100 only once
/// `done >= total`.
pub fn progress_percent(done: u32, total: u32) -> u8 {
    if total == 0 || done >= total {
        return 100;
    }
    let pct = (f64::from(done) / f64::from(total) * 100.0).round() as u8;
    pct.min(99)
}

/// Human estimate for `remaining` steps: "< 1 min" or "~N min".
pub fn estimate_remaining(remaining: u32, seconds_per_step: u64) -> String {
    let secs = u64::from(remaining) * seconds_per_step;
    if secs < 60 {
        "< 1 min".to_string()
    } else {
        format!("~{} min", secs.div_ceil(60))
    }
}
