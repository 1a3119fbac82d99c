//! Per-user calculation history.
//!
//! Records are append-only. [`FileHistoryStore`] keeps one compressed file per
//! user under the database directory; [`MemoryHistoryStore`] keeps everything
//! in a map and is what the tests use.

use crate::calculator::{OperationTag, UserReference, format_number};
use crate::saving;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

const HISTORY_FILE: &str = "history.bin.gz";

/// Default number of records per history page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One successful calculation by a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    /// Username of the owner
    pub user: String,
    pub operand1: f64,
    pub operand2: f64,
    pub operation: OperationTag,
    pub result: f64,
    pub created_at: DateTime<Utc>,
}

impl CalculationRecord {
    pub fn new(
        user: &UserReference,
        operand1: f64,
        operand2: f64,
        operation: OperationTag,
        result: f64,
    ) -> Self {
        CalculationRecord {
            user: user.username().to_string(),
            operand1,
            operand2,
            operation,
            result,
            created_at: Utc::now(),
        }
    }

    /// `"10 ÷ 3"`
    pub fn expression(&self) -> String {
        format!(
            "{} {} {}",
            format_number(self.operand1),
            self.operation.symbol(),
            format_number(self.operand2)
        )
    }
}

impl fmt::Display for CalculationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.expression(), format_number(self.result))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("history storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid history owner: {0:?}")]
    InvalidUser(String),

    #[error("history store lock poisoned")]
    Poisoned,
}

/// Where successful calculations are recorded.
pub trait HistoryStore: Send + Sync {
    /// Appends a record to its owner's history.
    fn append(&self, record: CalculationRecord) -> Result<(), StoreError>;

    /// Returns a user's records, most recent first.
    fn list(&self, username: &str) -> Result<Vec<CalculationRecord>, StoreError>;
}

/// History kept as `<dir>/<username>/history.bin.gz`.
pub struct FileHistoryStore {
    dir: PathBuf,
    // Appends are read-modify-write on the user's file.
    write_lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileHistoryStore {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn history_path(&self, username: &str) -> Result<PathBuf, StoreError> {
        let valid = !username.is_empty()
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidUser(username.to_string()));
        }
        Ok(self.dir.join(username).join(HISTORY_FILE))
    }

    fn load(&self, path: &Path) -> Result<Vec<CalculationRecord>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(saving::load_history(path)?)
    }
}

impl HistoryStore for FileHistoryStore {
    fn append(&self, record: CalculationRecord) -> Result<(), StoreError> {
        let path = self.history_path(&record.user)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut records = self.load(&path)?;
        records.push(record);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        saving::save_history(&records, &path)?;
        Ok(())
    }

    fn list(&self, username: &str) -> Result<Vec<CalculationRecord>, StoreError> {
        let path = self.history_path(username)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut records = self.load(&path)?;
        records.reverse();
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, Vec<CalculationRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records
            .read()
            .map(|records| records.values().all(Vec::is_empty))
            .unwrap_or(true)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: CalculationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.entry(record.user.clone()).or_default().push(record);
        Ok(())
    }

    fn list(&self, username: &str) -> Result<Vec<CalculationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .get(username)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

/// One page of a listing. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: usize,
    pub next: usize,
}

/// Cuts `items` into pages of `per_page` and returns page `page`.
///
/// Out-of-range page numbers clamp to the first or last page. An empty list
/// still has one (empty) page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let number = page.clamp(1, total_pages);

    let start = (number - 1) * per_page;
    let end = (start + per_page).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        number,
        total_pages,
        has_previous: number > 1,
        has_next: number < total_pages,
        previous: number.saturating_sub(1).max(1),
        next: (number + 1).min(total_pages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(user: &str, a: f64, b: f64) -> CalculationRecord {
        CalculationRecord::new(&UserReference::new(user), a, b, OperationTag::Add, a + b)
    }

    #[test]
    fn test_record_display() {
        let r = CalculationRecord::new(
            &UserReference::new("alice"),
            10.0,
            4.0,
            OperationTag::Divide,
            2.5,
        );
        assert_eq!(r.expression(), "10 ÷ 4");
        assert_eq!(r.to_string(), "10 ÷ 4 = 2.5");

        let huge = record("alice", 1e308, 1e-300);
        assert_eq!(huge.to_string(), "1e308 + 1e-300 = 1e308");
    }

    #[test]
    fn test_file_store_lists_most_recent_first() {
        let tmp = TempDir::new().unwrap();
        let store = FileHistoryStore::new(tmp.path());

        store.append(record("alice", 1.0, 1.0)).unwrap();
        store.append(record("alice", 2.0, 2.0)).unwrap();
        store.append(record("bob", 9.0, 9.0)).unwrap();

        let alice = store.list("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].result, 4.0);
        assert_eq!(alice[1].result, 2.0);
        assert!(tmp.path().join("alice").join(HISTORY_FILE).exists());

        assert_eq!(store.list("bob").unwrap().len(), 1);
        assert!(store.list("carol").unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        FileHistoryStore::new(tmp.path())
            .append(record("alice", 3.0, 4.0))
            .unwrap();

        let reopened = FileHistoryStore::new(tmp.path());
        let records = reopened.list("alice").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operand1, 3.0);
        assert_eq!(records[0].operation, OperationTag::Add);
    }

    #[test]
    fn test_file_store_rejects_path_like_users() {
        let tmp = TempDir::new().unwrap();
        let store = FileHistoryStore::new(tmp.path());

        for user in ["", "..", "a/b", "../etc"] {
            assert!(matches!(
                store.append(record(user, 1.0, 1.0)),
                Err(StoreError::InvalidUser(_))
            ));
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryHistoryStore::new();
        assert!(store.is_empty());

        store.append(record("alice", 1.0, 2.0)).unwrap();
        store.append(record("alice", 5.0, 5.0)).unwrap();

        let list = store.list("alice").unwrap();
        assert_eq!(list[0].result, 10.0);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=23).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);
        assert!(!first.has_previous);
        assert!(first.has_next);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23]);
        assert!(last.has_previous);
        assert!(!last.has_next);
        assert_eq!(last.previous, 2);
    }

    #[test]
    fn test_paginate_clamps() {
        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(paginate(&items, 0, 2).number, 1);
        assert_eq!(paginate(&items, 99, 2).number, 3);
        assert_eq!(paginate(&items, 99, 2).items, vec![5]);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 4, 10);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }
}
