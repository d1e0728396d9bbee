//! # Persistence Layer
//!
//! Three storage scopes back the editor: a durable per-template auto-save
//! slot, a single global manual-save slot, and a short-lived cross-navigation
//! pending-save slot. All of them sit on a small key-value abstraction so the
//! durable scope can be file-backed while tests and the session scope stay in
//! memory.

mod records;

pub use records::{
    auto_save_max_age, pending_save_max_age, AutoSaveRecord, ManualSaveRecord,
    PendingTemplateSave, SaveIntent, MANUAL_SAVE_KEY, PENDING_SAVE_KEY,
};

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ReceiptError;

/// String key-value storage, the shape of the browser storage the original
/// design was built on.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ReceiptError>;
    fn remove(&mut self, key: &str);
}

/// In-memory store: session scope and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ReceiptError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Durable store: one JSON file per key under a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ReceiptError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are already sanitized identifiers, but never trust a path join.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                error!("failed to read stored entry '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ReceiptError> {
        fs::write(self.path_for(key), value)
            .map_err(|e| ReceiptError::Storage(format!("write '{}': {}", key, e)))
    }

    fn remove(&mut self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove stored entry '{}': {}", key, e);
            }
        }
    }
}

/// Read and parse a record. Corrupt JSON is logged and the offending entry is
/// deleted rather than propagated.
pub fn read_record<T: DeserializeOwned>(store: &mut dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            error!("corrupt record at '{}', discarding: {}", key, e);
            store.remove(key);
            None
        }
    }
}

/// Serialize and persist a record.
pub fn write_record<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    record: &T,
) -> Result<(), ReceiptError> {
    let raw = serde_json::to_string(record)?;
    store.set(key, &raw)
}

/// Derive the template slug from a page path.
///
/// `/generate-walmart-receipt` → `walmart`, `/generate-best-buy-receipt` →
/// `best-buy`, any `/generate-advanced` path → `advanced`, anything else → "".
/// Slugs only ever match by case-sensitive string equality.
pub fn template_slug(path: &str) -> String {
    for segment in path.split('/') {
        if let Some(rest) = segment.strip_prefix("generate-") {
            if let Some(slug) = rest.strip_suffix("-receipt") {
                if !slug.is_empty() {
                    return slug.to_string();
                }
            }
        }
    }
    if path.contains("/generate-advanced") {
        return "advanced".to_string();
    }
    String::new()
}

/// Per-template auto-save key: the page path with separators flattened.
pub fn auto_save_key(path: &str) -> String {
    let flattened: String = path
        .chars()
        .map(|c| if c == '/' || c == '-' { '_' } else { c })
        .collect();
    format!("receipt_autosave{flattened}")
}
