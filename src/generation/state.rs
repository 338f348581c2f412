use std::fmt;

use crate::service::PendingJob;

use super::job::GenerationJob;

/// Coarse phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Running => write!(f, "RUNNING"),
            Phase::Paused => write!(f, "PAUSED"),
        }
    }
}

/// How the last job left the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed {
        simulado_id: String,
        geradas: u32,
        erros: u32,
    },
    Cancelled {
        simulado_id: String,
    },
}

/// Everything a caller can observe about the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationState {
    /// The single non-terminal job, if any.
    pub job: Option<GenerationJob>,
    /// Raised when an incomplete job was found (locally on startup or on the
    /// server) and the user should be offered to resume it.
    pub pending_recognized: bool,
    /// Incomplete jobs reported by the server for the current user.
    pub remote_pending: Vec<PendingJob>,
    /// Remaining-time estimate for the active job.
    pub tempo_estimado: Option<String>,
    pub last_outcome: Option<GenerationOutcome>,
}

impl GenerationState {
    pub fn phase(&self) -> Phase {
        match &self.job {
            None => Phase::Idle,
            Some(job) if job.pausado => Phase::Paused,
            Some(_) => Phase::Running,
        }
    }

    pub fn progress(&self) -> u8 {
        self.job.as_ref().map(GenerationJob::progress).unwrap_or(0)
    }

    pub fn geradas(&self) -> u32 {
        self.job.as_ref().map(|j| j.geradas).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_job() {
        let mut state = GenerationState::default();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.progress(), 0);

        let mut job = GenerationJob::new("sim1".into(), "t".into(), 4);
        job.geradas = 1;
        state.job = Some(job.clone());
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.progress(), 25);

        job.pausado = true;
        state.job = Some(job);
        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(state.phase().to_string(), "PAUSED");
    }
}
