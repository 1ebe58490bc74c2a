//! Summary cache over a [`KeyValueStore`].
//!
//! The cache is the only owner of its four store keys. Each write is one
//! atomic read-modify-write through [`KeyValueStore::update`], and reads load
//! all four keys from one consistent view, so no caller (in this process or
//! another one sharing the store) observes or overwrites a half-applied update.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use super::history::{self, HISTORY_LIMIT, PAGE_HISTORY_LIMIT};
use super::normalize::{normalize_url, origin_title_key};
use super::resolve::{self, CacheSnapshot, MatchStep, Query};
use super::store::KeyValueStore;
use crate::error::Result;
use crate::models::SummaryRecord;

pub const EXACT_INDEX_KEY: &str = "summaries";
pub const NORMALIZED_INDEX_KEY: &str = "summariesByNorm";
pub const ORIGIN_TITLE_INDEX_KEY: &str = "summariesByOriginTitle";
pub const HISTORY_KEY: &str = "summariesHistory";

const STORE_KEYS: [&str; 4] = [
    EXACT_INDEX_KEY,
    NORMALIZED_INDEX_KEY,
    ORIGIN_TITLE_INDEX_KEY,
    HISTORY_KEY,
];

/// A lookup hit together with the fallback step that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub step: MatchStep,
    pub record: SummaryRecord,
}

pub struct SummaryCache<S> {
    store: S,
    gate: RwLock<()>,
    history_limit: usize,
}

impl<S: KeyValueStore> SummaryCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_history_limit(store, HISTORY_LIMIT)
    }

    /// A zero limit is raised to one so the latest write is always kept.
    pub fn with_history_limit(store: S, history_limit: usize) -> Self {
        Self {
            store,
            gate: RwLock::new(()),
            history_limit: history_limit.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn lookup(&self, url: &str, title: &str) -> Result<Option<SummaryRecord>> {
        Ok(self.resolve(url, title).await?.map(|r| r.record))
    }

    /// Like [`lookup`](Self::lookup), also reporting which step matched.
    pub async fn resolve(&self, url: &str, title: &str) -> Result<Option<Resolution>> {
        let _read = self.gate.read().await;
        let snapshot = snapshot_from(self.store.get_many(&STORE_KEYS).await?);
        let query = Query::new(url, title);

        Ok(resolve::resolve(&snapshot, &query).map(|(step, record)| Resolution {
            step,
            record: record.clone(),
        }))
    }

    /// Writes `record` into all three indices and the history log as one update.
    pub async fn record_and_store(&self, record: SummaryRecord) -> Result<()> {
        let _write = self.gate.write().await;
        let url = record.url.clone();
        let history_limit = self.history_limit;

        self.store
            .update(
                &STORE_KEYS,
                Box::new(move |values| apply_record(values, record, history_limit)),
            )
            .await?;

        tracing::info!("Cached summary for {}", url);
        Ok(())
    }

    /// Up to five most recent summaries of the page at `url`, newest first.
    pub async fn page_history(&self, url: &str) -> Result<Vec<SummaryRecord>> {
        let _read = self.gate.read().await;
        let history = self.load_history().await?;
        Ok(history::entries_for_page(&history, url, PAGE_HISTORY_LIMIT))
    }

    async fn load_history(&self) -> Result<Vec<SummaryRecord>> {
        Ok(decode_history(self.store.get(HISTORY_KEY).await?))
    }
}

/// New values for the four keys after storing `record` on top of `values`
/// (read in `STORE_KEYS` order).
fn apply_record(
    values: Vec<Option<Value>>,
    record: SummaryRecord,
    history_limit: usize,
) -> Result<Vec<(String, Value)>> {
    let CacheSnapshot {
        mut exact,
        mut normalized,
        mut origin_title,
        history,
    } = snapshot_from(values);

    exact.insert(record.url.clone(), record.clone());
    normalized.insert(normalize_url(&record.url), record.clone());
    if let Some(key) = origin_title_key(&record.url, &record.title) {
        origin_title.insert(key, record.clone());
    }
    let history = history::push_front(history, record, history_limit);
    tracing::debug!("History holds {} entries", history.len());

    Ok(vec![
        (EXACT_INDEX_KEY.to_string(), serde_json::to_value(&exact)?),
        (NORMALIZED_INDEX_KEY.to_string(), serde_json::to_value(&normalized)?),
        (ORIGIN_TITLE_INDEX_KEY.to_string(), serde_json::to_value(&origin_title)?),
        (HISTORY_KEY.to_string(), serde_json::to_value(&history)?),
    ])
}

fn snapshot_from(values: Vec<Option<Value>>) -> CacheSnapshot {
    let mut values = values.into_iter();
    let mut next = || values.next().flatten();

    CacheSnapshot {
        exact: decode_index(EXACT_INDEX_KEY, next()),
        normalized: decode_index(NORMALIZED_INDEX_KEY, next()),
        origin_title: decode_index(ORIGIN_TITLE_INDEX_KEY, next()),
        history: decode_history(next()),
    }
}

fn decode_index(key: &str, value: Option<Value>) -> HashMap<String, SummaryRecord> {
    value.map(|v| decode_or_default(key, v)).unwrap_or_default()
}

fn decode_history(value: Option<Value>) -> Vec<SummaryRecord> {
    let Some(value) = value else {
        return Vec::new();
    };
    let Value::Array(items) = value else {
        tracing::warn!("Ignoring non-array value stored under {}", HISTORY_KEY);
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping unreadable history entry: {}", e);
                None
            }
        })
        .collect()
}

/// Corrupt values read as empty, the same as an absent key.
fn decode_or_default<T: DeserializeOwned + Default>(key: &str, value: Value) -> T {
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable value stored under {}: {}", key, e);
        T::default()
    })
}
