use anyhow::Result;
use chrono::Utc;
use log::warn;
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::Database;

/// Cached responses live for a day; the app targets users who are offline
/// for long stretches, so entries have to survive restarts but not grow
/// forever.
pub const CACHE_TTL_MINUTES: i64 = 60 * 24;

impl Database {
    /// Upserts an entry and, in the same task, sweeps every expired row.
    /// The sweep is the only cleanup the cache gets; there is no
    /// background eviction timer.
    pub async fn cache_put(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            let now = Utc::now().timestamp_millis();
            let expires_at = now + CACHE_TTL_MINUTES * 60 * 1000;

            conn.execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![now],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Misses on absent and on expired entries; an expired entry is
    /// removed on the way out.
    pub async fn cache_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                    params![key.clone()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            match row {
                Some((value, expires_at)) => {
                    if expires_at <= Utc::now().timestamp_millis() {
                        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                        Ok(None)
                    } else {
                        Ok(Some(value))
                    }
                }
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn cache_put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.cache_put(key, &serialized).await
    }

    /// A cached payload that no longer decodes is treated as a miss.
    pub async fn cache_get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = match self.cache_get(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Discarding undecodable cache entry '{key}': {err}");
                Ok(None)
            }
        }
    }
}
