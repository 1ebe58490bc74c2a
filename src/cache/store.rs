//! Key-value persistence boundary for the summary cache.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

/// Atomic read-modify-write step: receives the current values of the
/// requested keys (in request order) and returns the entries to write.
pub type UpdateFn =
    Box<dyn FnOnce(Vec<Option<Value>>) -> Result<Vec<(String, Value)>> + Send>;

/// Asynchronous string-keyed storage of JSON values.
///
/// Implementations give no ordering guarantee between independent calls.
/// `set_many` defaults to sequential `set`s; backends that can commit several
/// keys together should override it. `update` must run its read, `apply` and
/// write as one unit against every other writer of the same storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        futures::future::try_join_all(keys.iter().map(|key| self.get(key))).await
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    /// Nothing is written when `apply` fails.
    async fn update(&self, keys: &[&str], apply: UpdateFn) -> Result<()>;
}

/// Process-local store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        let guard = self.entries.read().await;
        Ok(keys.iter().map(|key| guard.get(*key).cloned()).collect())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.extend(entries);
        Ok(())
    }

    async fn update(&self, keys: &[&str], apply: UpdateFn) -> Result<()> {
        let mut guard = self.entries.write().await;
        let current = keys.iter().map(|key| guard.get(*key).cloned()).collect();
        let writes = apply(current)?;
        guard.extend(writes);
        Ok(())
    }
}
