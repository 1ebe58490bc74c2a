use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use tokio_rusqlite::Connection;

use crate::cache::{KeyValueStore, UpdateFn};
use crate::error::Result;

use super::schema::{PRAGMAS, SCHEMA};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`KeyValueStore`]. Values are stored as JSON text.
///
/// Several handles (or processes) may share one database file: `update`
/// runs inside a `BEGIN IMMEDIATE` transaction, so concurrent writers queue
/// on SQLite's write lock instead of overwriting each other.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(PRAGMAS)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

fn read_texts(
    conn: &rusqlite::Connection,
    keys: &[String],
) -> rusqlite::Result<Vec<Option<String>>> {
    let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
    keys.iter()
        .map(|key| {
            stmt.query_row(params![key], |row| row.get::<_, String>(0))
                .optional()
        })
        .collect()
}

fn write_rows(conn: &rusqlite::Connection, rows: &[(String, String)]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"INSERT INTO kv (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = datetime('now')"#,
    )?;
    for (key, text) in rows {
        stmt.execute(params![key, text])?;
    }
    Ok(())
}

fn decode_texts(texts: Vec<Option<String>>) -> Result<Vec<Option<Value>>> {
    texts
        .into_iter()
        .map(|text| match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        })
        .collect()
}

fn encode_rows(entries: Vec<(String, Value)>) -> Result<Vec<(String, String)>> {
    entries
        .into_iter()
        .map(|(key, value)| -> Result<(String, String)> {
            Ok((key, serde_json::to_string(&value)?))
        })
        .collect()
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut values = self.get_many(&[key]).await?;
        Ok(values.pop().flatten())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)]).await
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        let texts = self
            .conn
            .call(move |conn| {
                // One read transaction, so every key comes from the same commit.
                let tx = conn.transaction()?;
                let texts = read_texts(&tx, &keys)?;
                tx.commit()?;
                Ok(texts)
            })
            .await?;

        decode_texts(texts)
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let rows = encode_rows(entries)?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                write_rows(&tx, &rows)?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn update(&self, keys: &[&str], apply: UpdateFn) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let texts = read_texts(&tx, &keys)?;
                let rows = match decode_texts(texts).and_then(apply).and_then(encode_rows) {
                    Ok(rows) => rows,
                    // Dropping `tx` rolls back.
                    Err(e) => return Ok(Err(e)),
                };
                write_rows(&tx, &rows)?;
                tx.commit()?;
                Ok(Ok(()))
            })
            .await?
    }
}
