//! Interface de terminal do simugen: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso e `console` para
//! estilização com cores. O [`GenerationProgress`] acompanha visualmente
//! a execução de um job de geração no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::generation::{GenerationJob, GenerationOutcome, GenerationState, Phase};
use crate::service::PendingJob;
use crate::tasks::{Notification, Task, TaskStatus};

/// Indicador visual de progresso para um job de geração.
pub struct GenerationProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo amarelo para pausa e cancelamento.
    yellow: Style,
}

impl GenerationProgress {
    /// Cria a barra com o total do job e a posição atual.
    pub fn start(job: &GenerationJob) -> Self {
        let pb = ProgressBar::new(u64::from(job.total));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(job.titulo.clone());
        pb.set_position(u64::from(job.geradas));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza posição e mensagem a partir do estado publicado.
    pub fn update(&self, state: &GenerationState) {
        let Some(job) = &state.job else {
            return;
        };
        self.pb.set_position(u64::from(job.geradas));
        self.pb.set_message(describe_step(job, state.tempo_estimado.as_deref()));
    }

    /// Finaliza a barra e exibe o desfecho.
    pub fn finish(&self, state: &GenerationState) {
        self.pb.finish_and_clear();
        match (&state.last_outcome, state.phase()) {
            (Some(GenerationOutcome::Completed { geradas, erros, .. }), Phase::Idle) => {
                println!(
                    "  {} {geradas} questões geradas ({erros} erros)",
                    self.green.apply_to("✓")
                );
            }
            (Some(GenerationOutcome::Cancelled { simulado_id }), Phase::Idle) => {
                println!("  {} Geração de {simulado_id} cancelada", self.yellow.apply_to("✗"));
            }
            (_, Phase::Paused) => {
                println!(
                    "  {} Geração pausada em {}/{}; use `simugen resume` para continuar",
                    self.yellow.apply_to("⏸"),
                    state.geradas(),
                    state.job.as_ref().map(|j| j.total).unwrap_or(0)
                );
            }
            _ => {}
        }
    }
}

fn describe_step(job: &GenerationJob, tempo: Option<&str>) -> String {
    let mut msg = match &job.item_atual {
        Some(item) => match &item.assunto {
            Some(assunto) => format!("#{} {} / {assunto}", item.ordem, item.disciplina),
            None => format!("#{} {}", item.ordem, item.disciplina),
        },
        None => String::new(),
    };
    if let Some(tempo) = tempo {
        if !msg.is_empty() {
            msg.push_str(" · ");
        }
        msg.push_str(tempo);
    }
    msg
}

/// Imprime um aviso de retomada.
pub fn print_notification(notification: &Notification) {
    let yellow = Style::new().yellow().bold();
    println!("{} {}", yellow.apply_to("!"), notification.title);
    println!("  {}", notification.message);
}

/// Imprime o job local e o histórico de tarefas.
pub fn print_status(state: &GenerationState, tasks: &[Task]) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("─── Geração ───"));
    match &state.job {
        Some(job) => {
            println!(
                "  {} [{}] {}/{} ({}%) erros={} · {}",
                job.titulo,
                state.phase(),
                job.geradas,
                job.total,
                job.progress(),
                job.erros,
                state.tempo_estimado.as_deref().unwrap_or("-")
            );
        }
        None => println!("  nenhum job ativo"),
    }

    println!("{}", bold.apply_to("─── Tarefas ───"));
    if tasks.is_empty() {
        println!("  nenhuma tarefa registrada");
    }
    for task in tasks {
        let style = match task.status {
            TaskStatus::Completed => Style::new().green(),
            TaskStatus::Failed => Style::new().red(),
            TaskStatus::Interrupted => Style::new().yellow(),
            _ => Style::new().cyan(),
        };
        println!(
            "  {} {} ({}) {}",
            style.apply_to(task.status),
            task.title,
            task.kind,
            task.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

/// Imprime jobs pendentes reportados pelo servidor.
pub fn print_pending(jobs: &[PendingJob]) {
    if jobs.is_empty() {
        println!("  nenhum job pendente no servidor");
        return;
    }
    for job in jobs {
        println!("  {} {} {}/{}", job.id, job.titulo, job.geradas, job.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ItemAtual;

    #[test]
    fn describe_step_with_item_and_estimate() {
        let mut job = GenerationJob::new("sim1".into(), "Português".into(), 10);
        job.item_atual = Some(ItemAtual {
            disciplina: "Português".into(),
            assunto: Some("Crase".into()),
            ordem: 3,
        });
        assert_eq!(describe_step(&job, Some("~2 min")), "#3 Português / Crase · ~2 min");
    }

    #[test]
    fn describe_step_without_item() {
        let job = GenerationJob::new("sim1".into(), "t".into(), 10);
        assert_eq!(describe_step(&job, Some("< 1 min")), "< 1 min");
        assert_eq!(describe_step(&job, None), "");
    }
}
