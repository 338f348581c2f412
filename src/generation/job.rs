use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::service::{ItemAtual, PendingJob, StepResult};
use crate::timing::{estimate_remaining, progress_percent};

/// One sequential generation job, as persisted in the local snapshot.
///
/// `geradas` and `erros` mirror the server's counters. They only move forward
/// and `geradas` never exceeds `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub simulado_id: String,
    pub titulo: String,
    pub total: u32,
    pub geradas: u32,
    pub erros: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_atual: Option<ItemAtual>,
    pub iniciado_em: DateTime<Utc>,
    #[serde(default)]
    pub pausado: bool,
}

impl GenerationJob {
    pub fn new(simulado_id: String, titulo: String, total: u32) -> Self {
        Self {
            simulado_id,
            titulo,
            total,
            geradas: 0,
            erros: 0,
            item_atual: None,
            iniciado_em: Utc::now(),
            pausado: false,
        }
    }

    /// Adopts a job the server reported as incomplete. Starts paused.
    pub fn from_pending(pending: PendingJob) -> Self {
        Self {
            geradas: pending.geradas.min(pending.total),
            pausado: true,
            ..Self::new(pending.id, pending.titulo, pending.total)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.geradas >= self.total
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.geradas)
    }

    pub fn progress(&self) -> u8 {
        progress_percent(self.geradas, self.total)
    }

    pub fn tempo_estimado(&self, seconds_per_step: u64) -> String {
        estimate_remaining(self.remaining(), seconds_per_step)
    }

    /// Takes the server's counters for this step.
    ///
    /// A regressing counter keeps the local value; `geradas` is capped at `total`.
    pub fn merge_step(&mut self, step: &StepResult) {
        if step.geradas < self.geradas || step.erros < self.erros {
            warn!(
                job_id = %self.simulado_id,
                local_geradas = self.geradas,
                server_geradas = step.geradas,
                "server counters went backwards, keeping local values"
            );
        }
        self.geradas = self.geradas.max(step.geradas).min(self.total);
        self.erros = self.erros.max(step.erros);
        self.item_atual = step.item_atual.clone();
    }
}
