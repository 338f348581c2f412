//! Configuração do simugen carregada a partir de `simugen.toml`.
//!
//! A struct [`EngineConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `SIMUGEN_API_KEY` e `SIMUGEN_BASE_URL` têm
//! precedência sobre o arquivo.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::error::EngineError;
use crate::service::client::DEFAULT_BASE_URL;
use crate::tasks::DEFAULT_TASK_HISTORY;
use crate::timing::Pacing;

pub const DEFAULT_CONFIG_FILE: &str = "simugen.toml";

/// Configuração de nível superior carregada de `simugen.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// URL base do serviço de geração.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token enviado como `Authorization: Bearer`.
    #[serde(default)]
    pub api_key: String,

    /// Diretório onde o estado durável é gravado.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Quantas tarefas recentes o registro mantém.
    #[serde(default = "default_task_history")]
    pub task_history: usize,

    /// Atrasos entre passos, backoff e debounces.
    #[serde(default)]
    pub pacing: Pacing,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".simugen")
}

fn default_task_history() -> usize {
    DEFAULT_TASK_HISTORY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            data_dir: default_data_dir(),
            task_history: default_task_history(),
            pacing: Pacing::default(),
        }
    }
}

impl EngineConfig {
    /// Carrega a configuração de `path` (ou `simugen.toml` no diretório atual).
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EngineConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
        if let Ok(key) = std::env::var("SIMUGEN_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }
        if let Ok(url) = std::env::var("SIMUGEN_BASE_URL")
            && !url.is_empty()
        {
            config.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.task_history == 0 {
            return Err(EngineError::Config("task_history must be at least 1".into()));
        }
        self.pacing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.task_history, 10);
        assert_eq!(config.data_dir, PathBuf::from(".simugen"));
        assert_eq!(config.pacing, Pacing::default());
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"
            task_history = 5

            [pacing]
            step_delay_ms = 1000
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.task_history, 5);
        assert_eq!(config.pacing.step_delay_ms, 1000);
        assert_eq!(config.pacing.retry_delay_ms, 5000);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn rejects_backoff_not_longer_than_step() {
        let toml_str = r#"
            [pacing]
            step_delay_ms = 6000
            retry_delay_ms = 5000
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn load_reads_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simugen.toml");
        std::fs::write(&path, "data_dir = \"/tmp/simugen-state\"\n").unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/simugen-state"));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.task_history, 10);
    }
}
