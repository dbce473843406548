use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use std::sync::Mutex;

use crate::error::CacheError;

const DDL: &str = "
CREATE TABLE IF NOT EXISTS fundamental_cache (
    ticker TEXT NOT NULL,
    metric TEXT NOT NULL,
    value TEXT NOT NULL,
    cached_at TEXT NOT NULL,
    PRIMARY KEY (ticker, metric)
);
";

/// `data/cache/fundamentals.db` from spec.md §6: `fundamental_cache(ticker,
/// metric, value, cached_at)` with TTL enforced on read (not on write — stale
/// rows are simply treated as a miss until overwritten).
pub struct FundamentalsCache {
    conn: Mutex<Connection>,
}

impl FundamentalsCache {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fetch a cached value, treating it as a miss if `cached_at + ttl <= now`.
    pub fn get(&self, ticker: &str, metric: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("fundamentals mutex poisoned: {e}")))?;
        let mut stmt = conn.prepare_cached(
            "SELECT value, cached_at FROM fundamental_cache WHERE ticker = ?1 AND metric = ?2",
        )?;
        let result = stmt.query_row(rusqlite::params![ticker, metric], |row| {
            let value: String = row.get(0)?;
            let cached_at: String = row.get(1)?;
            Ok((value, cached_at))
        });

        match result {
            Ok((value, cached_at)) => {
                let cached_at: DateTime<Utc> = cached_at
                    .parse()
                    .map_err(|e| CacheError::Unavailable(format!("bad timestamp: {e}")))?;
                if Utc::now() - cached_at < ttl {
                    Ok(Some(value))
                } else {
                    Ok(None)
                }
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    pub fn put(&self, ticker: &str, metric: &str, value: &str) -> Result<(), CacheError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("fundamentals mutex poisoned: {e}")))?;
        conn.execute(
            "INSERT INTO fundamental_cache (ticker, metric, value, cached_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(ticker, metric) DO UPDATE SET value = excluded.value, cached_at = excluded.cached_at",
            rusqlite::params![ticker, metric, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
