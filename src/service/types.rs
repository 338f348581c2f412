//! Tipos de dados trocados com o serviço de geração.
//!
//! Os nomes dos campos seguem o formato JSON do servidor (`geradas`, `erros`,
//! `itemAtual`, ...), convertidos via `serde(rename_all = "camelCase")`.

use serde::{Deserialize, Serialize};

/// Descrição da unidade sendo gerada no momento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAtual {
    /// Disciplina da questão em geração.
    pub disciplina: String,
    /// Assunto dentro da disciplina, quando o servidor informa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assunto: Option<String>,
    /// Posição da questão no simulado.
    pub ordem: u32,
}

/// Resultado de um passo de geração (`advance`).
///
/// Os contadores são do servidor e valem como verdade: o cliente nunca os
/// recalcula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Unidades já geradas.
    pub geradas: u32,
    /// Falhas contabilizadas pelo servidor.
    pub erros: u32,
    /// Unidade em andamento, se houver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_atual: Option<ItemAtual>,
    /// `true` quando o servidor considera o job encerrado.
    pub concluido: bool,
}

/// Job incompleto reportado pelo servidor em `list_pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    pub id: String,
    pub titulo: String,
    pub total: u32,
    pub geradas: u32,
}
