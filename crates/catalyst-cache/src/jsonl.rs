use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use catalyst_models::OutcomeRecord;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CacheError;

/// Append-only JSONL log with a single writer mutex and a line-flush per
/// write, per spec.md §5's "Shared resources" note. Backs
/// `data/rejected_items.jsonl` and `data/accepted_items.jsonl`.
pub struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), CacheError> {
        let line = serde_json::to_string(record)?;
        let mut file = self
            .file
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("append log mutex poisoned: {e}")))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }

    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, CacheError> {
        read_jsonl(&self.path)
    }
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CacheError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// `data/moa/outcomes.jsonl`: unlike `AppendLog`, entries are keyed by
/// `(ticker, rejection_ts)` and rewritten in place when the key reappears
/// (spec.md §6), since each horizon's outcome arrives on a separate tick of
/// the price-tracker task and mutates the same record.
pub struct OutcomesStore {
    path: PathBuf,
    records: Mutex<HashMap<(String, DateTime<Utc>), OutcomeRecord>>,
}

impl OutcomesStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existing: Vec<OutcomeRecord> = read_jsonl(&path)?;
        let records = existing
            .into_iter()
            .map(|r| ((r.ticker.clone(), r.rejection_ts), r))
            .collect();
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn get(&self, ticker: &str, rejection_ts: DateTime<Utc>) -> Result<Option<OutcomeRecord>, CacheError> {
        let records = self
            .records
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("outcomes mutex poisoned: {e}")))?;
        Ok(records.get(&(ticker.to_string(), rejection_ts)).cloned())
    }

    /// Insert or replace the record for `(ticker, rejection_ts)` and rewrite
    /// the whole file. Small enough in practice (bounded by MOA's lookback
    /// window) that a full rewrite per update is acceptable.
    pub fn upsert(&self, record: OutcomeRecord) -> Result<(), CacheError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("outcomes mutex poisoned: {e}")))?;
        records.insert((record.ticker.clone(), record.rejection_ts), record);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        for record in records.values() {
            writeln!(file, "{}", serde_json::to_string(record)?)?;
        }
        file.flush()?;
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<OutcomeRecord>, CacheError> {
        let records = self
            .records
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("outcomes mutex poisoned: {e}")))?;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct RejectedRow {
        ticker: String,
        price: rust_decimal::Decimal,
    }

    #[test]
    fn append_and_read_all() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::open(dir.path().join("rejected_items.jsonl")).unwrap();
        log.append(&RejectedRow {
            ticker: "ABCD".to_string(),
            price: dec!(2.00),
        })
        .unwrap();
        log.append(&RejectedRow {
            ticker: "WXYZ".to_string(),
            price: dec!(5.50),
        })
        .unwrap();

        let rows: Vec<RejectedRow> = log.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "ABCD");
    }

    #[test]
    fn read_all_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::open(dir.path().join("nested/rejected_items.jsonl")).unwrap();
        let rows: Vec<RejectedRow> = log.read_all().unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn outcomes_upsert_rewrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutcomesStore::open(dir.path().join("outcomes.jsonl")).unwrap();
        let rejection_ts = Utc::now();

        let mut record = OutcomeRecord::new("ABCD".to_string(), rejection_ts, dec!(2.00), "below_threshold".to_string());
        record.set_horizon("1h", catalyst_models::HorizonOutcome {
            price: dec!(2.05),
            return_pct: dec!(2.5),
            checked_at: rejection_ts,
        });
        store.upsert(record).unwrap();

        let mut updated = store.get("ABCD", rejection_ts).unwrap().unwrap();
        updated.set_horizon("4h", catalyst_models::HorizonOutcome {
            price: dec!(2.30),
            return_pct: dec!(15.0),
            checked_at: rejection_ts,
        });
        store.upsert(updated).unwrap();

        assert_eq!(store.all().unwrap().len(), 1);
        let final_record = store.get("ABCD", rejection_ts).unwrap().unwrap();
        assert!(final_record.is_missed_opportunity);
        assert_eq!(final_record.max_return_pct, dec!(15.0));
    }

    #[test]
    fn reopening_store_loads_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        let rejection_ts = Utc::now();
        {
            let store = OutcomesStore::open(&path).unwrap();
            let record = OutcomeRecord::new("ABCD".to_string(), rejection_ts, dec!(2.00), "below_threshold".to_string());
            store.upsert(record).unwrap();
        }
        let reopened = OutcomesStore::open(&path).unwrap();
        assert_eq!(reopened.all().unwrap().len(), 1);
    }
}
