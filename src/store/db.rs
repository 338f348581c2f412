use std::path::Path;

use sled::Tree;

use crate::error::EngineError;

use super::KeyValueStore;

const TREE_STATE: &str = "simugen_state";

/// Store backed by an embedded sled database: one tree, key → JSON bytes.
///
/// Every write is flushed before returning. Clones share the same database,
/// so a clone handed to a fresh registry or orchestrator sees what the
/// previous owner left behind, like the disk after a restart.
#[derive(Clone)]
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    /// Opens (creating if needed) the database under `dir`. sled locks the
    /// directory, so a second process opening it gets an error instead of
    /// racing the first one.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let db = sled::open(dir)?;
        let tree = db.open_tree(TREE_STATE)?;
        Ok(Self { tree })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let Some(raw) = self.tree.get(key.as_bytes())? else {
            return Ok(None);
        };
        // Invalid UTF-8 surfaces as unreadable JSON in `load_json`.
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        if self.tree.remove(key.as_bytes())?.is_some() {
            self.tree.flush()?;
        }
        Ok(())
    }
}
