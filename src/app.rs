//! Command implementations behind the `simugen` binary.
//!
//! [`App`] wires the durable store, the task registry and the generation
//! orchestrator together. Each generation run is mirrored into the registry
//! as a `simulado_generation` task whose `config` carries what is needed to
//! resume it.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::EngineConfig;
use crate::generation::{
    GenerationHandle, GenerationOrchestrator, GenerationOutcome, GenerationState, Phase,
};
use crate::service::{GenerationService, HttpGenerationService, PendingJob};
use crate::store::{KeyValueStore, SledStore};
use crate::tasks::{
    NewTask, Notification, TaskKind, TaskRegistry, TaskStatus, TaskUpdate,
};
use crate::ui::GenerationProgress;

pub struct App<S> {
    service: Arc<S>,
    registry: TaskRegistry,
    handle: GenerationHandle,
    notifications: mpsc::UnboundedReceiver<Notification>,
    user: Option<String>,
}

impl App<HttpGenerationService> {
    /// Opens the on-disk state under `config.data_dir` and talks HTTP to
    /// `config.base_url`. Must be called inside a Tokio runtime.
    pub fn open(config: &EngineConfig, user: Option<String>) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(
            SledStore::open(&config.data_dir)
                .with_context(|| format!("failed to open {}", config.data_dir.display()))?,
        );
        let service = Arc::new(HttpGenerationService::with_base_url(
            config.api_key.clone(),
            config.base_url.clone(),
        )?);
        Self::with_parts(config, store, service, user)
    }
}

impl<S: GenerationService + 'static> App<S> {
    pub fn with_parts(
        config: &EngineConfig,
        store: Arc<dyn KeyValueStore>,
        service: Arc<S>,
        user: Option<String>,
    ) -> Result<Self> {
        let (tx, notifications) = mpsc::unbounded_channel();
        let mut registry =
            TaskRegistry::load(Arc::clone(&store), config.task_history)?.with_notifier(tx);
        let (handle, _actor) =
            GenerationOrchestrator::spawn(Arc::clone(&service), store, config.pacing.clone())?;

        if let Some(user) = &user {
            registry.identify(user);
            handle.identify(user.clone())?;
        }

        Ok(Self {
            service,
            registry,
            handle,
            notifications,
            user,
        })
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn handle(&self) -> &GenerationHandle {
        &self.handle
    }

    /// Resume prompts raised since the last call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }

    /// Starts a job and follows it until it completes or is paused.
    pub async fn generate(
        &mut self,
        simulado_id: &str,
        titulo: &str,
        total: u32,
    ) -> Result<GenerationState> {
        self.handle.start(simulado_id, titulo, total)?;
        let task_id = self.registry.add_task(
            NewTask::new(TaskKind::SimuladoGeneration, titulo)
                .with_description(format!("{total} questões"))
                .with_config(resume_config(simulado_id, titulo, total)),
            TaskStatus::Running,
        )?;
        self.wait_until_running().await?;
        self.follow(&task_id).await
    }

    /// Resumes the local paused job, or adopts `remote` from the server first.
    pub async fn resume(&mut self, remote: Option<&str>) -> Result<GenerationState> {
        if let Some(remote_id) = remote {
            let pending = self.find_remote(remote_id).await?;
            self.handle.recover(pending)?;
            self.handle
                .wait_for(|s| s.phase() == Phase::Paused || s.last_outcome.is_some())
                .await?;
        }

        let state = self.handle.state();
        let Some(job) = state.job else {
            bail!("no paused generation job to resume");
        };

        let config = resume_config(&job.simulado_id, &job.titulo, job.total);
        if let Some(previous) = self.mirror_task_id(&job.simulado_id) {
            let status = self.registry.get_task_by_id(&previous).map(|t| t.status);
            if status == Some(TaskStatus::Interrupted) {
                self.registry.take_interrupted(&previous)?;
            } else {
                self.registry.remove_task(&previous)?;
            }
        }
        let task_id = self.registry.add_task(
            NewTask::new(TaskKind::SimuladoGeneration, job.titulo.clone())
                .with_description(format!("{} questões", job.total))
                .with_config(config),
            TaskStatus::Running,
        )?;
        self.registry
            .update_task(&task_id, TaskUpdate::progress(job.progress()))?;

        self.handle.resume()?;
        self.wait_until_running().await?;
        self.follow(&task_id).await
    }

    /// Cancels the local job and drops its mirror task.
    pub async fn cancel(&mut self) -> Result<GenerationState> {
        let Some(job) = self.handle.state().job else {
            bail!("no generation job to cancel");
        };
        self.handle.cancel()?;
        let state = self.handle.wait_for(|s| s.job.is_none()).await?;
        if let Some(task_id) = self.mirror_task_id(&job.simulado_id) {
            self.registry.remove_task(&task_id)?;
        }
        Ok(state)
    }

    pub fn status(&mut self, clear_finished: bool) -> Result<GenerationState> {
        if clear_finished {
            self.registry.clear_finished()?;
        }
        Ok(self.handle.state())
    }

    pub async fn pending(&self) -> Result<Vec<PendingJob>> {
        let Some(user) = &self.user else {
            bail!("--user is required to list pending jobs");
        };
        Ok(self.service.list_pending(user).await?)
    }

    async fn find_remote(&self, id: &str) -> Result<PendingJob> {
        self.pending()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .with_context(|| format!("server has no pending job {id}"))
    }

    async fn wait_until_running(&self) -> Result<()> {
        self.handle
            .wait_for(|s| s.phase() == Phase::Running || s.last_outcome.is_some())
            .await?;
        Ok(())
    }

    /// Renders progress and mirrors it into the registry until the job leaves
    /// the running phase. Ctrl-C pauses the job, and a paused job leaves its
    /// task interrupted so `resume` can pick it up.
    async fn follow(&mut self, task_id: &str) -> Result<GenerationState> {
        let mut rx = self.handle.subscribe();
        let initial = rx.borrow_and_update().clone();
        let progress = initial.job.as_ref().map(GenerationProgress::start);
        let mut state = initial;

        while state.phase() == Phase::Running {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        bail!("generation orchestrator stopped");
                    }
                    state = rx.borrow_and_update().clone();
                    if let Some(bar) = &progress {
                        bar.update(&state);
                    }
                    if state.job.is_some() {
                        self.registry
                            .update_task(task_id, TaskUpdate::progress(state.progress()))?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    if let Err(e) = self.handle.pause() {
                        warn!(error = %e, "could not pause generation");
                    }
                }
            }
        }

        if let Some(GenerationOutcome::Completed { geradas, erros, .. }) = &state.last_outcome
            && state.job.is_none()
        {
            self.registry.update_task(
                task_id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    progress: Some(100),
                    result: Some(json!({ "geradas": geradas, "erros": erros })),
                    ..Default::default()
                },
            )?;
        } else if state.phase() == Phase::Paused {
            self.registry
                .update_task(task_id, TaskUpdate::progress(state.progress()))?;
            self.registry.interrupt(task_id)?;
        }
        if let Some(bar) = &progress {
            bar.finish(&state);
        }
        Ok(state)
    }

    fn mirror_task_id(&self, simulado_id: &str) -> Option<String> {
        self.registry
            .tasks()
            .iter()
            .find(|t| {
                t.kind == TaskKind::SimuladoGeneration
                    && !t.status.is_terminal()
                    && t.config
                        .as_ref()
                        .and_then(|c| c.get("simuladoId"))
                        .and_then(Value::as_str)
                        == Some(simulado_id)
            })
            .map(|t| t.id.clone())
    }
}

fn resume_config(simulado_id: &str, titulo: &str, total: u32) -> Value {
    json!({ "simuladoId": simulado_id, "titulo": titulo, "total": total })
}
