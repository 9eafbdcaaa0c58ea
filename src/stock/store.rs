//! Storage collaborators for the stock engine
//!
//! The engine talks to two narrow seams: a [`Catalog`] answering "does this
//! part exist" and a [`StockStore`] offering point lookups, flagged upserts,
//! append-only ledger inserts and per-part queries. The production
//! implementation is [`FsStore`]: YAML documents per part plus a JSON-lines
//! ledger, all under the project tree. No store-side joins or transactions
//! are assumed anywhere.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::core::project::Project;
use crate::entities::item::Item;
use crate::entities::part::Part;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("malformed ledger record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of an upsert at the store boundary.
///
/// `Unchanged` means the store reports neither a modification nor a creation;
/// the engine treats that as a storage failure. A store that rewrites an
/// existing document reports `Updated` even when the new value equals the old
/// one, which is what lets repeated equal corrections succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
    Unchanged,
}

/// One BOM edge: a child base number and its positive consumption multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub partno: String,
    pub quantity: u32,
}

/// Stock record of one base part number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub partno: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bom: Vec<BomLine>,
}

impl StockEntry {
    pub fn new(partno: &str) -> Self {
        Self {
            partno: partno.to_string(),
            quantity: 0,
            bom: Vec::new(),
        }
    }
}

/// The change carried by a ledger record: a signed delta for count updates,
/// an absolute quantity for corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockChange {
    Delta { delta: i64 },
    Absolute { quantity: i64 },
}

/// Immutable, append-only ledger record of one stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub partno: String,
    #[serde(flatten)]
    pub change: StockChange,
    pub message: String,
}

impl HistoryRecord {
    pub fn delta(partno: &str, delta: i64, message: &str) -> Self {
        Self {
            id: Ulid::new().to_string(),
            date: Utc::now(),
            partno: partno.to_string(),
            change: StockChange::Delta { delta },
            message: message.to_string(),
        }
    }

    pub fn absolute(partno: &str, quantity: i64, message: &str) -> Self {
        Self {
            id: Ulid::new().to_string(),
            date: Utc::now(),
            partno: partno.to_string(),
            change: StockChange::Absolute { quantity },
            message: message.to_string(),
        }
    }
}

/// Named sub-count of a part's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub partno: String,
    pub name: String,
    pub quantity: i64,
}

/// Point lookup into the part catalog.
pub trait Catalog {
    fn exists(&self, partno: &str) -> Result<bool, StoreError>;

    /// Number of revisions of the given base number, if it exists.
    fn revision_count(&self, partno: &str) -> Result<Option<usize>, StoreError>;
}

/// Document-store seam for stock entries, batches and the ledger.
pub trait StockStore {
    fn entry(&self, partno: &str) -> Result<Option<StockEntry>, StoreError>;

    fn list_entries(&self) -> Result<Vec<StockEntry>, StoreError>;

    fn increment_quantity(&self, partno: &str, delta: i64) -> Result<Upsert, StoreError>;

    fn set_quantity(&self, partno: &str, quantity: i64) -> Result<Upsert, StoreError>;

    fn replace_bom(&self, partno: &str, bom: Vec<BomLine>) -> Result<Upsert, StoreError>;

    fn increment_batch(&self, partno: &str, batch: &str, quantity: i64)
        -> Result<Upsert, StoreError>;

    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;

    fn history(&self, partno: &str) -> Result<Vec<HistoryRecord>, StoreError>;

    fn batches(&self, partno: &str) -> Result<Vec<BatchRecord>, StoreError>;
}

/// Filesystem-backed store: one YAML document per part under `stock/` and
/// `catalog/`, plus the append-only `stock/ledger.jsonl`.
pub struct FsStore {
    project: Project,
}

const DOC_SUFFIX: &str = ".pst.yaml";

impl FsStore {
    pub fn new(project: &Project) -> Self {
        Self {
            project: project.clone(),
        }
    }

    fn entry_path(&self, partno: &str) -> PathBuf {
        self.project
            .stock_entries_dir()
            .join(format!("{partno}{DOC_SUFFIX}"))
    }

    fn batches_path(&self, partno: &str) -> PathBuf {
        self.project
            .stock_batches_dir()
            .join(format!("{partno}{DOC_SUFFIX}"))
    }

    fn catalog_path(&self, partno: &str) -> PathBuf {
        self.project
            .catalog_dir()
            .join(format!("{partno}{DOC_SUFFIX}"))
    }

    fn read_doc<T: serde::de::DeserializeOwned + 'static>(
        &self,
        path: &PathBuf,
    ) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_yml::from_str(&content)?))
    }

    fn write_doc<T: Serialize>(&self, path: &PathBuf, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yml::to_string(doc)?)?;
        Ok(())
    }

    /// Load a catalog part definition, if present.
    pub fn part(&self, partno: &str) -> Result<Option<Part>, StoreError> {
        self.read_doc(&self.catalog_path(partno))
    }

    /// Store a catalog part definition (create or replace).
    pub fn put_part(&self, part: &Part) -> Result<(), StoreError> {
        self.write_doc(&self.catalog_path(&part.partno), part)
    }

    /// All catalog part definitions, sorted by part number.
    pub fn list_parts(&self) -> Result<Vec<Part>, StoreError> {
        let mut parts = Vec::new();
        for entry in walkdir::WalkDir::new(self.project.catalog_dir())
            .min_depth(1)
            .max_depth(1)
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry
                .file_name()
                .to_string_lossy()
                .ends_with(DOC_SUFFIX)
            {
                let content = fs::read_to_string(entry.path())?;
                parts.push(serde_yml::from_str::<Part>(&content)?);
            }
        }
        parts.sort_by(|a, b| a.partno.cmp(&b.partno));
        Ok(parts)
    }

    fn item_path(&self, serial: &str) -> PathBuf {
        self.project.items_dir().join(format!("{serial}{DOC_SUFFIX}"))
    }

    /// Load an item document, if present.
    pub fn item(&self, serial: &str) -> Result<Option<Item>, StoreError> {
        self.read_doc(&self.item_path(serial))
    }

    /// Store an item document (create or replace).
    pub fn put_item(&self, item: &Item) -> Result<(), StoreError> {
        self.write_doc(&self.item_path(&item.serial), item)
    }

    /// All item documents, sorted by serial.
    pub fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        for entry in walkdir::WalkDir::new(self.project.items_dir())
            .min_depth(1)
            .max_depth(1)
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry
                .file_name()
                .to_string_lossy()
                .ends_with(DOC_SUFFIX)
            {
                let content = fs::read_to_string(entry.path())?;
                items.push(serde_yml::from_str::<Item>(&content)?);
            }
        }
        items.sort_by(|a, b| a.serial.cmp(&b.serial));
        Ok(items)
    }

    fn upsert_entry<F>(&self, partno: &str, mutate: F) -> Result<Upsert, StoreError>
    where
        F: FnOnce(&mut StockEntry),
    {
        let path = self.entry_path(partno);
        let (mut entry, outcome) = match self.read_doc::<StockEntry>(&path)? {
            Some(entry) => (entry, Upsert::Updated),
            None => (StockEntry::new(partno), Upsert::Created),
        };
        mutate(&mut entry);
        self.write_doc(&path, &entry)?;
        Ok(outcome)
    }
}

impl Catalog for FsStore {
    fn exists(&self, partno: &str) -> Result<bool, StoreError> {
        Ok(self.catalog_path(partno).exists())
    }

    fn revision_count(&self, partno: &str) -> Result<Option<usize>, StoreError> {
        Ok(self.part(partno)?.map(|part| part.revisions.len()))
    }
}

impl StockStore for FsStore {
    fn entry(&self, partno: &str) -> Result<Option<StockEntry>, StoreError> {
        self.read_doc(&self.entry_path(partno))
    }

    fn list_entries(&self) -> Result<Vec<StockEntry>, StoreError> {
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(self.project.stock_entries_dir())
            .min_depth(1)
            .max_depth(1)
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry
                .file_name()
                .to_string_lossy()
                .ends_with(DOC_SUFFIX)
            {
                let content = fs::read_to_string(entry.path())?;
                entries.push(serde_yml::from_str::<StockEntry>(&content)?);
            }
        }
        entries.sort_by(|a, b| a.partno.cmp(&b.partno));
        Ok(entries)
    }

    fn increment_quantity(&self, partno: &str, delta: i64) -> Result<Upsert, StoreError> {
        self.upsert_entry(partno, |entry| entry.quantity += delta)
    }

    fn set_quantity(&self, partno: &str, quantity: i64) -> Result<Upsert, StoreError> {
        self.upsert_entry(partno, |entry| entry.quantity = quantity)
    }

    fn replace_bom(&self, partno: &str, bom: Vec<BomLine>) -> Result<Upsert, StoreError> {
        self.upsert_entry(partno, |entry| entry.bom = bom)
    }

    fn increment_batch(
        &self,
        partno: &str,
        batch: &str,
        quantity: i64,
    ) -> Result<Upsert, StoreError> {
        let path = self.batches_path(partno);
        let (mut batches, outcome) = match self.read_doc::<BTreeMap<String, i64>>(&path)? {
            Some(batches) => (batches, Upsert::Updated),
            None => (BTreeMap::new(), Upsert::Created),
        };
        *batches.entry(batch.to_string()).or_insert(0) += quantity;
        self.write_doc(&path, &batches)?;
        Ok(outcome)
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let path = self.project.ledger_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn history(&self, partno: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let path = self.project.ledger_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for line in fs::read_to_string(path)?.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let record: HistoryRecord = serde_json::from_str(line)?;
            if record.partno == partno {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn batches(&self, partno: &str) -> Result<Vec<BatchRecord>, StoreError> {
        let batches = self
            .read_doc::<BTreeMap<String, i64>>(&self.batches_path(partno))?
            .unwrap_or_default();
        Ok(batches
            .into_iter()
            .map(|(name, quantity)| BatchRecord {
                partno: partno.to_string(),
                name,
                quantity,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, FsStore) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let store = FsStore::new(&project);
        (tmp, store)
    }

    #[test]
    fn test_increment_creates_then_updates() {
        let (_tmp, store) = store();

        assert_eq!(store.increment_quantity("AB1234", 5).unwrap(), Upsert::Created);
        assert_eq!(store.increment_quantity("AB1234", -2).unwrap(), Upsert::Updated);
        assert_eq!(store.entry("AB1234").unwrap().unwrap().quantity, 3);
    }

    #[test]
    fn test_set_quantity_rewrites_equal_value() {
        let (_tmp, store) = store();

        assert_eq!(store.set_quantity("AB1234", 5).unwrap(), Upsert::Created);
        // an equal-value rewrite still reports Updated
        assert_eq!(store.set_quantity("AB1234", 5).unwrap(), Upsert::Updated);
        assert_eq!(store.entry("AB1234").unwrap().unwrap().quantity, 5);
    }

    #[test]
    fn test_replace_bom_preserves_quantity() {
        let (_tmp, store) = store();

        store.increment_quantity("AB1234", 7).unwrap();
        let bom = vec![BomLine {
            partno: "CH0001".to_string(),
            quantity: 2,
        }];
        assert_eq!(store.replace_bom("AB1234", bom.clone()).unwrap(), Upsert::Updated);

        let entry = store.entry("AB1234").unwrap().unwrap();
        assert_eq!(entry.quantity, 7);
        assert_eq!(entry.bom, bom);
    }

    #[test]
    fn test_batches_accumulate_per_name() {
        let (_tmp, store) = store();

        store.increment_batch("AB1234", "b1", 3).unwrap();
        store.increment_batch("AB1234", "b1", 2).unwrap();
        store.increment_batch("AB1234", "b2", 1).unwrap();

        let batches = store.batches("AB1234").unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].name, "b1");
        assert_eq!(batches[0].quantity, 5);
        assert_eq!(batches[1].name, "b2");
        assert_eq!(batches[1].quantity, 1);
    }

    #[test]
    fn test_ledger_appends_and_filters_by_part() {
        let (_tmp, store) = store();

        store
            .append_history(&HistoryRecord::delta("AB1234", 3, "restock"))
            .unwrap();
        store
            .append_history(&HistoryRecord::delta("CH0001", -6, "(BOM rule)"))
            .unwrap();
        store
            .append_history(&HistoryRecord::absolute("AB1234", 10, "correction"))
            .unwrap();

        let records = store.history("AB1234").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].change, StockChange::Delta { delta: 3 });
        assert_eq!(records[1].change, StockChange::Absolute { quantity: 10 });
        assert!(store.history("ZZ0001").unwrap().is_empty());
    }

    #[test]
    fn test_catalog_over_part_files() {
        let (_tmp, store) = store();

        assert!(!Catalog::exists(&store, "AB1234").unwrap());
        let part = Part::new("AB1234", "Amplifier board", "hf");
        store.put_part(&part).unwrap();
        assert!(Catalog::exists(&store, "AB1234").unwrap());
        assert_eq!(store.revision_count("AB1234").unwrap(), Some(1));
        assert_eq!(store.revision_count("ZZ0001").unwrap(), None);
    }

    #[test]
    fn test_list_entries_sorted() {
        let (_tmp, store) = store();
        store.increment_quantity("ZZ0001", 1).unwrap();
        store.increment_quantity("AB1234", 1).unwrap();

        let entries = store.list_entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.partno.as_str()).collect();
        assert_eq!(names, ["AB1234", "ZZ0001"]);
    }
}
