use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::service::{GenerationService, PendingJob};
use crate::store::{GENERATION_JOB_KEY, KeyValueStore, load_json, save_json};
use crate::timing::Pacing;

use super::job::GenerationJob;
use super::state::{GenerationOutcome, GenerationState};

enum Command {
    Start {
        simulado_id: String,
        titulo: String,
        total: u32,
    },
    Recover(PendingJob),
    Pause,
    Resume,
    Cancel,
    Identify(String),
}

/// Cloneable front end of a running [`GenerationOrchestrator`].
///
/// Every method returns immediately: it only flips the shared active flag or
/// queues a command. The actor applies queued commands between steps, never
/// while an `advance` call is in flight.
#[derive(Clone)]
pub struct GenerationHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<GenerationState>,
    active: Arc<AtomicBool>,
}

impl GenerationHandle {
    /// Starts a new job. Fails if a job (running or paused) already exists.
    pub fn start(
        &self,
        simulado_id: impl Into<String>,
        titulo: impl Into<String>,
        total: u32,
    ) -> Result<(), EngineError> {
        if total == 0 {
            return Err(EngineError::InvalidTotal);
        }
        self.claim()?;
        self.send(Command::Start {
            simulado_id: simulado_id.into(),
            titulo: titulo.into(),
            total,
        })
        .inspect_err(|_| self.active.store(false, Ordering::SeqCst))
    }

    /// Adopts a job the server reported as pending. It stays paused until
    /// [`resume`](Self::resume).
    pub fn recover(&self, pending: PendingJob) -> Result<(), EngineError> {
        if pending.total == 0 {
            return Err(EngineError::InvalidTotal);
        }
        self.claim()?;
        self.send(Command::Recover(pending))
            .inspect_err(|_| self.active.store(false, Ordering::SeqCst))
    }

    pub fn pause(&self) -> Result<(), EngineError> {
        self.require_active()?;
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), EngineError> {
        self.require_active()?;
        self.send(Command::Resume)
    }

    pub fn cancel(&self) -> Result<(), EngineError> {
        self.require_active()?;
        self.send(Command::Cancel)
    }

    /// Signals that the user's identity is known. Only the first call per
    /// orchestrator schedules the server-side pending check.
    pub fn identify(&self, user_id: impl Into<String>) -> Result<(), EngineError> {
        self.send(Command::Identify(user_id.into()))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Latest published state.
    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `pred`.
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&GenerationState) -> bool,
    ) -> Result<GenerationState, EngineError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(pred)
            .await
            .map_err(|_| EngineError::OrchestratorClosed)?;
        Ok(state.clone())
    }

    fn claim(&self) -> Result<(), EngineError> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| EngineError::JobAlreadyActive)
    }

    fn require_active(&self) -> Result<(), EngineError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EngineError::NoActiveJob)
        }
    }

    fn send(&self, cmd: Command) -> Result<(), EngineError> {
        self.commands
            .send(cmd)
            .map_err(|_| EngineError::OrchestratorClosed)
    }
}

/// Single-owner actor driving at most one generation job.
///
/// Steps are strictly sequential: step N+1 is requested only after step N's
/// response has been merged and the inter-step delay has elapsed. Pause and
/// cancel are cooperative and take effect between steps.
pub struct GenerationOrchestrator<S> {
    service: Arc<S>,
    store: Arc<dyn KeyValueStore>,
    pacing: Pacing,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<GenerationState>,
    active: Arc<AtomicBool>,
    job: Option<GenerationJob>,
    aborted: bool,
    next_step_at: Option<Instant>,
    pending_check: Option<(Instant, String)>,
    identified: bool,
    pending_recognized: bool,
    remote_pending: Vec<PendingJob>,
    last_outcome: Option<GenerationOutcome>,
}

impl<S: GenerationService + 'static> GenerationOrchestrator<S> {
    /// Restores any persisted job and spawns the actor on the current Tokio
    /// runtime.
    ///
    /// A restored job is always paused and raises `pending_recognized`; it is
    /// never resumed without an explicit [`GenerationHandle::resume`]. The
    /// actor stops once every handle is dropped.
    pub fn spawn(
        service: Arc<S>,
        store: Arc<dyn KeyValueStore>,
        pacing: Pacing,
    ) -> Result<(GenerationHandle, JoinHandle<()>), EngineError> {
        pacing.validate()?;

        let restored = match load_json::<GenerationJob>(store.as_ref(), GENERATION_JOB_KEY)? {
            Some(job) if job.is_complete() => {
                store.remove(GENERATION_JOB_KEY)?;
                None
            }
            Some(mut job) => {
                job.pausado = true;
                save_json(store.as_ref(), GENERATION_JOB_KEY, &job)?;
                info!(
                    job_id = %job.simulado_id,
                    geradas = job.geradas,
                    total = job.total,
                    "found incomplete generation job, waiting for resume"
                );
                Some(job)
            }
            None => None,
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(GenerationState::default());
        let active = Arc::new(AtomicBool::new(restored.is_some()));

        let orchestrator = Self {
            service,
            store,
            pacing,
            commands: cmd_rx,
            state_tx,
            active: Arc::clone(&active),
            aborted: restored.is_some(),
            pending_recognized: restored.is_some(),
            job: restored,
            next_step_at: None,
            pending_check: None,
            identified: false,
            remote_pending: Vec::new(),
            last_outcome: None,
        };
        orchestrator.publish();

        let handle = GenerationHandle {
            commands: cmd_tx,
            state: state_rx,
            active,
        };
        let task = tokio::spawn(orchestrator.run());
        Ok((handle, task))
    }

    async fn run(mut self) {
        loop {
            let step_at = self.next_step_at;
            let check_at = self.pending_check.as_ref().map(|(at, _)| *at);

            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                _ = sleep_until(step_at.unwrap_or_else(Instant::now)), if step_at.is_some() => {
                    self.step().await;
                }
                _ = sleep_until(check_at.unwrap_or_else(Instant::now)), if check_at.is_some() => {
                    self.check_remote_pending().await;
                }
            }
        }
        debug!("generation orchestrator stopped");
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start {
                simulado_id,
                titulo,
                total,
            } => self.on_start(GenerationJob::new(simulado_id, titulo, total)),
            Command::Recover(pending) => self.on_recover(pending),
            Command::Pause => self.on_pause(),
            Command::Resume => self.on_resume(),
            Command::Cancel => self.on_cancel().await,
            Command::Identify(user_id) => self.on_identify(user_id),
        }
    }

    fn on_start(&mut self, job: GenerationJob) {
        if let Some(current) = &self.job {
            warn!(job_id = %current.simulado_id, "start ignored, a job is already active");
            return;
        }
        info!(job_id = %job.simulado_id, total = job.total, "starting generation job");
        self.job = Some(job);
        self.aborted = false;
        self.pending_recognized = false;
        self.remote_pending.clear();
        self.last_outcome = None;
        self.next_step_at = Some(Instant::now() + self.pacing.start_debounce());
        self.persist();
        self.publish();
    }

    fn on_recover(&mut self, pending: PendingJob) {
        if let Some(current) = &self.job {
            warn!(job_id = %current.simulado_id, "recover ignored, a job is already active");
            return;
        }
        let job = GenerationJob::from_pending(pending);
        if job.is_complete() {
            info!(job_id = %job.simulado_id, "pending job is already complete, nothing to recover");
            self.remote_pending.retain(|p| p.id != job.simulado_id);
            self.pending_recognized = !self.remote_pending.is_empty();
            self.active.store(false, Ordering::SeqCst);
            self.publish();
            return;
        }
        info!(job_id = %job.simulado_id, geradas = job.geradas, "recovered pending generation job");
        self.job = Some(job);
        self.aborted = true;
        self.pending_recognized = false;
        self.remote_pending.clear();
        self.last_outcome = None;
        self.persist();
        self.publish();
    }

    fn on_pause(&mut self) {
        let Some(job) = self.job.as_mut() else {
            debug!("pause ignored, no job");
            return;
        };
        if job.pausado {
            debug!(job_id = %job.simulado_id, "pause ignored, already paused");
            return;
        }
        job.pausado = true;
        info!(job_id = %job.simulado_id, geradas = job.geradas, "generation paused");
        self.aborted = true;
        self.next_step_at = None;
        self.persist();
        self.publish();
    }

    fn on_resume(&mut self) {
        let Some(job) = self.job.as_mut() else {
            debug!("resume ignored, no job");
            return;
        };
        if !job.pausado {
            debug!(job_id = %job.simulado_id, "resume ignored, loop already running");
            return;
        }
        job.pausado = false;
        info!(job_id = %job.simulado_id, geradas = job.geradas, "generation resumed");
        self.aborted = false;
        self.pending_recognized = false;
        self.next_step_at = Some(Instant::now() + self.pacing.resume_debounce());
        self.persist();
        self.publish();
    }

    async fn on_cancel(&mut self) {
        self.aborted = true;
        self.next_step_at = None;
        let Some(job) = self.job.take() else {
            debug!("cancel ignored, no job");
            return;
        };

        if let Err(e) = self.service.cancel(&job.simulado_id).await {
            warn!(job_id = %job.simulado_id, error = %e, "remote cancel failed, clearing local job anyway");
        }

        if let Err(e) = self.store.remove(GENERATION_JOB_KEY) {
            error!(error = %e, "failed to remove generation snapshot");
        }
        info!(job_id = %job.simulado_id, geradas = job.geradas, "generation cancelled");
        self.pending_recognized = false;
        self.remote_pending.clear();
        self.last_outcome = Some(GenerationOutcome::Cancelled {
            simulado_id: job.simulado_id,
        });
        self.active.store(false, Ordering::SeqCst);
        self.publish();
    }

    fn on_identify(&mut self, user_id: String) {
        if self.identified {
            return;
        }
        self.identified = true;
        self.pending_check = Some((Instant::now() + self.pacing.pending_check_delay(), user_id));
    }

    /// One pass of the processing loop.
    async fn step(&mut self) {
        self.next_step_at = None;
        if self.aborted {
            return;
        }
        let Some(job_id) = self.job.as_ref().map(|j| j.simulado_id.clone()) else {
            return;
        };

        let result = self.service.advance(&job_id).await;
        let Some(job) = self.job.as_mut() else {
            return;
        };

        match result {
            Err(e) => {
                let delay = self.pacing.retry_delay_for(&e);
                warn!(
                    job_id = %job_id,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "generation step failed, retrying"
                );
                self.next_step_at = Some(Instant::now() + delay);
            }
            Ok(step) => {
                job.merge_step(&step);
                debug!(job_id = %job_id, geradas = job.geradas, total = job.total, erros = job.erros, "step merged");
                if step.concluido || job.is_complete() {
                    self.finish();
                } else {
                    self.next_step_at = Some(Instant::now() + self.pacing.step_delay());
                    self.persist();
                    self.publish();
                }
            }
        }
    }

    fn finish(&mut self) {
        let Some(job) = self.job.take() else {
            return;
        };
        if let Err(e) = self.store.remove(GENERATION_JOB_KEY) {
            error!(error = %e, "failed to remove generation snapshot");
        }
        info!(
            job_id = %job.simulado_id,
            geradas = job.geradas,
            erros = job.erros,
            "generation job completed"
        );
        self.last_outcome = Some(GenerationOutcome::Completed {
            simulado_id: job.simulado_id,
            geradas: job.geradas,
            erros: job.erros,
        });
        self.active.store(false, Ordering::SeqCst);
        self.publish();
    }

    async fn check_remote_pending(&mut self) {
        let Some((_, user_id)) = self.pending_check.take() else {
            return;
        };
        let jobs = match self.service.list_pending(&user_id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "could not list pending generation jobs");
                return;
            }
        };

        let local_id = self.job.as_ref().map(|j| j.simulado_id.as_str());
        let pending: Vec<PendingJob> = jobs
            .into_iter()
            .filter(|p| p.geradas < p.total && Some(p.id.as_str()) != local_id)
            .collect();
        if pending.is_empty() {
            return;
        }
        info!(user_id = %user_id, count = pending.len(), "server reports incomplete generation jobs");
        self.remote_pending = pending;
        self.pending_recognized = true;
        self.publish();
    }

    fn persist(&self) {
        let Some(job) = &self.job else {
            return;
        };
        let result = if job.is_complete() {
            self.store.remove(GENERATION_JOB_KEY)
        } else {
            save_json(self.store.as_ref(), GENERATION_JOB_KEY, job)
        };
        if let Err(e) = result {
            error!(job_id = %job.simulado_id, error = %e, "failed to persist generation snapshot");
        }
    }

    fn publish(&self) {
        let tempo_estimado = self
            .job
            .as_ref()
            .map(|j| j.tempo_estimado(self.pacing.seconds_per_step));
        self.state_tx.send_replace(GenerationState {
            job: self.job.clone(),
            pending_recognized: self.pending_recognized,
            remote_pending: self.remote_pending.clone(),
            tempo_estimado,
            last_outcome: self.last_outcome.clone(),
        });
    }
}
