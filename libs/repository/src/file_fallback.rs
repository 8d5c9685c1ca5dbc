//! The belt-and-braces file fallback (§6.4): a JSON map keyed by pair key,
//! written after every `create_pool` and read only if the repository is
//! unreachable at startup.

use crate::error::Result;
use crate::model::PoolRow;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

pub struct FileFallbackStore {
    path: PathBuf,
}

impl FileFallbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn pair_key(token_a: &str, token_b: &str) -> String {
        if token_a <= token_b {
            format!("{token_a}|{token_b}")
        } else {
            format!("{token_b}|{token_a}")
        }
    }

    /// Appends or replaces `row` in the on-disk map, keyed by pair key.
    pub fn persist(&self, row: &PoolRow) -> Result<()> {
        let mut map = self.load_raw().unwrap_or_default();
        map.insert(Self::pair_key(&row.token_a, &row.token_b), row.clone());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&map)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn load_raw(&self) -> Result<HashMap<String, PoolRow>> {
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read path used only when the repository itself is unreachable at
    /// startup. Never fails loudly: a missing or corrupt fallback file
    /// just yields an empty pool set.
    pub fn load(&self) -> Vec<PoolRow> {
        match self.load_raw() {
            Ok(map) => map.into_values().collect(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "fallback pool file unreadable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");
        let store = FileFallbackStore::new(&path);

        store
            .persist(&PoolRow {
                pool_address: "pool1".into(),
                token_a: "A".into(),
                token_b: "B".into(),
                lp_token_address: Some("lp1".into()),
                creator: "creator1".into(),
            })
            .unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pool_address, "pool1");
    }
}
