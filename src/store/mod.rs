//! Armazenamento durável chave → JSON.
//!
//! O motor só depende do contrato [`KeyValueStore`]: ler, gravar e remover um
//! texto JSON sob uma chave fixa. [`SledStore`] guarda tudo numa árvore sled
//! dentro de `data_dir`.

mod db;

pub use db::SledStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::EngineError;

/// Chave do snapshot do job de geração em andamento (no máximo um).
pub const GENERATION_JOB_KEY: &str = "simulado_generation_job";

/// Chave da lista limitada de tarefas em segundo plano.
pub const TASKS_KEY: &str = "background_tasks";

/// Armazenamento durável de textos JSON indexados por chave.
pub trait KeyValueStore: Send + Sync {
    /// Retorna o valor gravado sob `key`, se existir.
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Grava (ou substitui) o valor sob `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), EngineError>;

    /// Remove `key`. Remover uma chave ausente não é erro.
    fn remove(&self, key: &str) -> Result<(), EngineError>;
}

/// Serializa `value` e grava sob `key`.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), EngineError> {
    let payload = serde_json::to_string(value)?;
    store.set(key, &payload)
}

/// Lê e desserializa o valor sob `key`.
///
/// JSON ilegível é registrado, descartado e tratado como ausente.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, EngineError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "discarding unreadable persisted state");
            store.remove(key)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SledStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = temp_store();
        let sample = Sample {
            name: "simulado".into(),
            count: 3,
        };
        save_json(&store, "k", &sample).unwrap();
        let loaded: Option<Sample> = load_json(&store, "k").unwrap();
        assert_eq!(loaded, Some(sample));
    }

    #[test]
    fn missing_key_loads_none() {
        let (_dir, store) = temp_store();
        let loaded: Option<Sample> = load_json(&store, "absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_value_is_discarded() {
        let (_dir, store) = temp_store();
        store.set("k", "{not json").unwrap();
        let loaded: Option<Sample> = load_json(&store, "k").unwrap();
        assert!(loaded.is_none());
        assert!(store.get("k").unwrap().is_none());
    }
}
