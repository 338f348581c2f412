#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::time::Instant;

use simugen::service::{GenerationService, PendingJob, ServiceError, StepResult};
use simugen::store::SledStore;

/// A fresh store in its own temp dir. Keep the dir alive as long as the store.
pub fn temp_store() -> (tempfile::TempDir, SledStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();
    (dir, store)
}

/// Self-tracking fake of the generation backend: it knows every job's total
/// and how many units it has produced, like the real server.
#[derive(Default)]
pub struct MockService {
    jobs: Mutex<HashMap<String, (u32, u32)>>,
    failures_left: AtomicU32,
    reported_erros: AtomicU32,
    cancel_fails: AtomicBool,
    pending: Mutex<Vec<PendingJob>>,
    gate: Option<Arc<Notify>>,
    gate_armed: AtomicBool,
    pub entered: Notify,
    advance_calls: AtomicU32,
    cancel_calls: AtomicU32,
    list_calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    call_times: Mutex<Vec<Instant>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(self, id: &str, total: u32) -> Self {
        self.with_job_progress(id, total, 0)
    }

    pub fn with_job_progress(self, id: &str, total: u32, geradas: u32) -> Self {
        self.jobs
            .lock()
            .unwrap()
            .insert(id.to_string(), (total, geradas));
        self
    }

    /// The next `n` advance calls fail with a transport error.
    pub fn failing_first(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn reporting_erros(self, erros: u32) -> Self {
        self.reported_erros.store(erros, Ordering::SeqCst);
        self
    }

    pub fn with_failing_cancel(self) -> Self {
        self.cancel_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_pending(self, jobs: Vec<PendingJob>) -> Self {
        *self.pending.lock().unwrap() = jobs;
        self
    }

    /// The first advance call blocks until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self.gate_armed.store(true, Ordering::SeqCst);
        self
    }

    pub fn advance_calls(&self) -> u32 {
        self.advance_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> u32 {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn server_geradas(&self, id: &str) -> u32 {
        self.jobs.lock().unwrap().get(id).map(|j| j.1).unwrap_or(0)
    }
}

impl GenerationService for MockService {
    async fn advance(&self, job_id: &str) -> Result<StepResult, ServiceError> {
        self.advance_calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.entered.notify_one();

        if let Some(gate) = &self.gate
            && self.gate_armed.swap(false, Ordering::SeqCst)
        {
            gate.notified().await;
        }

        let result = if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(ServiceError::Unavailable("connection reset".into()))
        } else {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(job_id) {
                Some((total, geradas)) => {
                    *geradas = (*geradas + 1).min(*total);
                    Ok(StepResult {
                        geradas: *geradas,
                        erros: self.reported_erros.load(Ordering::SeqCst),
                        item_atual: None,
                        concluido: *geradas >= *total,
                    })
                }
                None => Err(ServiceError::Api {
                    status: 404,
                    message: format!("unknown job {job_id}"),
                }),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel_fails.load(Ordering::SeqCst) {
            return Err(ServiceError::Api {
                status: 503,
                message: format!("cannot cancel {job_id}"),
            });
        }
        self.jobs.lock().unwrap().remove(job_id);
        Ok(())
    }

    async fn list_pending(&self, _user_id: &str) -> Result<Vec<PendingJob>, ServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pending.lock().unwrap().clone())
    }
}
