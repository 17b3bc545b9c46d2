// History Store
// Append-only log of scored reviews, read back newest first

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use super::errors::ScoringError;
use crate::models::AnalysisRecord;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub text: String,
    pub label: String,
    pub confidence: f64,
    pub sentiment: f64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_record(record: &AnalysisRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: record.text.clone(),
            label: record.label.clone(),
            confidence: record.confidence,
            sentiment: record.sentiment,
            timestamp: Utc::now(),
        }
    }
}

pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> Result<(), ScoringError>;

    /// Newest first, at most `limit` entries
    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, ScoringError>;
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, entry: HistoryEntry) -> Result<(), ScoringError> {
        self.entries.lock().push(entry);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, ScoringError> {
        Ok(self.entries.lock().iter().rev().take(limit).cloned().collect())
    }
}

/// One JSON object per line
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn append(&self, entry: HistoryEntry) -> Result<(), ScoringError> {
        let line = serde_json::to_string(&entry)
            .map_err(|e| ScoringError::History(format!("Failed to serialize entry: {}", e)))?;

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ScoringError::History(format!("Failed to create history dir: {}", e)))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ScoringError::History(format!("Failed to open history: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| ScoringError::History(format!("Failed to write history: {}", e)))
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, ScoringError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| ScoringError::History(format!("Failed to read history: {}", e)))?;

        let mut entries: Vec<HistoryEntry> = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("[HISTORY] Skipping malformed line {}: {}", idx + 1, e),
            }
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
