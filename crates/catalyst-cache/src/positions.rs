use catalyst_models::{ClosedPosition, ManagedPosition};
use rusqlite::{Connection, OptionalExtension};

use crate::error::CacheError;

const DDL: &str = "
CREATE TABLE IF NOT EXISTS positions (
    position_id TEXT PRIMARY KEY,
    ticker TEXT NOT NULL,
    opened_at TEXT NOT NULL,
    data_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_positions_ticker ON positions (ticker);
CREATE INDEX IF NOT EXISTS idx_positions_opened_at ON positions (opened_at);

CREATE TABLE IF NOT EXISTS closed_positions (
    position_id TEXT PRIMARY KEY,
    ticker TEXT NOT NULL,
    closed_at TEXT NOT NULL,
    data_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_closed_positions_ticker ON closed_positions (ticker);
CREATE INDEX IF NOT EXISTS idx_closed_positions_closed_at ON closed_positions (closed_at);
";

/// `data/trading.db` from spec.md §3/§6. Unlike the fundamentals cache this
/// store is the system of record for open and closed positions, so writes
/// (open/reprice/close) go straight through WAL-mode SQLite with no hot
/// in-memory layer in front.
pub struct PositionsStore {
    conn: Connection,
}

impl PositionsStore {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DDL)?;
        Ok(Self { conn })
    }

    pub fn upsert_open(&self, position: &ManagedPosition) -> Result<(), CacheError> {
        let data_json = serde_json::to_string(position)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO positions (position_id, ticker, opened_at, data_json) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                position.position_id.to_string(),
                position.ticker,
                position.opened_at.to_rfc3339(),
                data_json,
            ],
        )?;
        Ok(())
    }

    pub fn get_open(&self, position_id: uuid::Uuid) -> Result<Option<ManagedPosition>, CacheError> {
        let data_json: Option<String> = self
            .conn
            .query_row(
                "SELECT data_json FROM positions WHERE position_id = ?1",
                rusqlite::params![position_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match data_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn list_open_for_ticker(&self, ticker: &str) -> Result<Vec<ManagedPosition>, CacheError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data_json FROM positions WHERE ticker = ?1 ORDER BY opened_at")?;
        let rows = stmt.query_map(rusqlite::params![ticker], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    pub fn list_all_open(&self) -> Result<Vec<ManagedPosition>, CacheError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data_json FROM positions ORDER BY opened_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    /// Move a position from `positions` to `closed_positions` atomically.
    pub fn close(&mut self, position_id: uuid::Uuid, closed: &ClosedPosition) -> Result<(), CacheError> {
        let data_json = serde_json::to_string(closed)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM positions WHERE position_id = ?1",
            rusqlite::params![position_id.to_string()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO closed_positions (position_id, ticker, closed_at, data_json) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                position_id.to_string(),
                closed.ticker,
                closed.closed_at.to_rfc3339(),
                data_json,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_closed_for_ticker(&self, ticker: &str) -> Result<Vec<ClosedPosition>, CacheError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT data_json FROM closed_positions WHERE ticker = ?1 ORDER BY closed_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![ticker], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    pub fn count_open(&self) -> Result<usize, CacheError> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))?;
        Ok(count)
    }
}
