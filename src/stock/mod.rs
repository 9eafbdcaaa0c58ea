//! Stock bookkeeping with BOM-aware count propagation
//!
//! Stock entries are keyed by the revisionless base part number; revisions
//! are interchangeable for counting purposes. An entry holds the current
//! count and optionally a BOM. Adding units of an assembly consumes units of
//! its children according to the BOM multipliers; every change lands in the
//! append-only ledger, and positive top-level additions can be attributed to
//! a named batch.
//!
//! Counts are deliberately not validated and may go negative.

pub mod store;

use std::collections::HashSet;

use thiserror::Error;

use crate::stock::store::{
    BomLine, Catalog, HistoryRecord, StockStore, StoreError, Upsert,
};

/// Ledger message attached to child updates driven by a BOM rule.
pub const BOM_RULE_MESSAGE: &str = "(BOM rule)";

#[derive(Debug, Error)]
pub enum StockError {
    #[error("unknown part number {0}")]
    UnknownPart(String),

    #[error("infinite loop detected in the BOM of {0}")]
    Cycle(String),

    #[error("no stock object modified nor created for {0}")]
    NoopUpsert(String),

    #[error("'{0}' is not a valid BOM multiplier (positive integer required)")]
    BadMultiplier(String),

    #[error("a batch cannot have negative quantities")]
    NegativeBatch,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stock operations over a catalog and a document store.
pub struct StockService<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    catalog: &'a C,
}

enum Walk {
    Enter(String),
    Exit(String),
}

struct Job {
    partno: String,
    delta: i64,
    batch: Option<String>,
    message: String,
}

impl<'a, S, C> StockService<'a, S, C>
where
    S: StockStore + ?Sized,
    C: Catalog + ?Sized,
{
    pub fn new(store: &'a S, catalog: &'a C) -> Self {
        Self { store, catalog }
    }

    fn ensure_exists(&self, partno: &str) -> Result<(), StockError> {
        if self.catalog.exists(partno)? {
            Ok(())
        } else {
            Err(StockError::UnknownPart(partno.to_string()))
        }
    }

    /// Check that the BOM reachable from `partno` is acyclic and references
    /// only known parts.
    ///
    /// Depth-first walk with an open-path set allocated fresh per call: a
    /// part may appear on several branches (diamonds are legal), but an edge
    /// back to a part whose children are still being visited is a cycle.
    pub fn validate_bom(&self, partno: &str) -> Result<(), StockError> {
        let mut open: HashSet<String> = HashSet::new();
        let mut stack = vec![Walk::Enter(partno.to_string())];

        while let Some(step) = stack.pop() {
            match step {
                Walk::Enter(current) => {
                    self.ensure_exists(&current)?;
                    if open.contains(&current) {
                        return Err(StockError::Cycle(current));
                    }
                    let bom = match self.store.entry(&current)? {
                        Some(entry) => entry.bom,
                        None => continue,
                    };
                    if bom.is_empty() {
                        continue;
                    }
                    open.insert(current.clone());
                    stack.push(Walk::Exit(current));
                    for line in bom.into_iter().rev() {
                        stack.push(Walk::Enter(line.partno));
                    }
                }
                Walk::Exit(current) => {
                    open.remove(&current);
                }
            }
        }
        Ok(())
    }

    /// Apply a signed count change to a part, cascading consumption into its
    /// BOM children.
    ///
    /// The tree is validated first; nothing is written when validation
    /// fails. The top-level entry, batch and ledger record are committed
    /// before any child is touched, so a failure partway down leaves the
    /// requested part's record consistent. Only positive deltas propagate
    /// (corrections of over-counted builds are not mirrored into children),
    /// and the batch attribution never propagates.
    pub fn update_counts(
        &self,
        partno: &str,
        delta: i64,
        batch: Option<&str>,
        message: &str,
    ) -> Result<(), StockError> {
        self.validate_bom(partno)?;

        let mut work = vec![Job {
            partno: partno.to_string(),
            delta,
            batch: batch.map(str::to_string),
            message: message.to_string(),
        }];

        while let Some(job) = work.pop() {
            if job.delta == 0 {
                continue;
            }

            match self.store.increment_quantity(&job.partno, job.delta)? {
                Upsert::Unchanged => return Err(StockError::NoopUpsert(job.partno)),
                Upsert::Created | Upsert::Updated => {}
            }

            if job.delta > 0 {
                if let Some(batch) = job.batch.as_deref() {
                    self.update_batch(&job.partno, batch, job.delta)?;
                }
            }

            self.store
                .append_history(&HistoryRecord::delta(&job.partno, job.delta, &job.message))?;

            if job.delta > 0 {
                let bom = self
                    .store
                    .entry(&job.partno)?
                    .map(|entry| entry.bom)
                    .unwrap_or_default();
                // reversed so the worklist pops children in BOM order
                for line in bom.into_iter().rev() {
                    work.push(Job {
                        partno: line.partno,
                        delta: job.delta * i64::from(line.quantity) * -1,
                        batch: None,
                        message: BOM_RULE_MESSAGE.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Set a part's count to an absolute value. A correction is ground
    /// truth: no BOM cascade, and the ledger record carries the resulting
    /// quantity rather than a delta.
    pub fn correct_counts(
        &self,
        partno: &str,
        quantity: i64,
        message: &str,
    ) -> Result<(), StockError> {
        match self.store.set_quantity(partno, quantity)? {
            Upsert::Unchanged => return Err(StockError::NoopUpsert(partno.to_string())),
            Upsert::Created | Upsert::Updated => {}
        }
        self.store
            .append_history(&HistoryRecord::absolute(partno, quantity, message))?;
        Ok(())
    }

    /// Increment the named batch counter of a part. Batches only ever grow.
    pub fn update_batch(
        &self,
        partno: &str,
        batch: &str,
        quantity: i64,
    ) -> Result<(), StockError> {
        if quantity < 0 {
            return Err(StockError::NegativeBatch);
        }
        self.ensure_exists(partno)?;
        if quantity == 0 || batch.is_empty() {
            return Ok(());
        }
        match self.store.increment_batch(partno, batch, quantity)? {
            Upsert::Unchanged => Err(StockError::NoopUpsert(partno.to_string())),
            Upsert::Created | Upsert::Updated => Ok(()),
        }
    }

    /// Replace a part's BOM wholesale. The target and every child must exist
    /// in the catalog; multipliers are coerced from text to positive
    /// integers.
    pub fn set_bom(&self, partno: &str, lines: &[(String, String)]) -> Result<(), StockError> {
        self.ensure_exists(partno)?;
        let mut bom = Vec::with_capacity(lines.len());
        for (child, multiplier) in lines {
            self.ensure_exists(child)?;
            let quantity: u32 = multiplier
                .trim()
                .parse()
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| StockError::BadMultiplier(multiplier.clone()))?;
            bom.push(BomLine {
                partno: child.clone(),
                quantity,
            });
        }
        match self.store.replace_bom(partno, bom)? {
            Upsert::Unchanged => Err(StockError::NoopUpsert(partno.to_string())),
            Upsert::Created | Upsert::Updated => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::store::{BatchRecord, StockChange, StockEntry};
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashMap};

    /// In-memory store double covering both collaborator seams.
    #[derive(Default)]
    struct MemStore {
        parts: RefCell<HashSet<String>>,
        entries: RefCell<HashMap<String, StockEntry>>,
        batches: RefCell<BTreeMap<(String, String), i64>>,
        ledger: RefCell<Vec<HistoryRecord>>,
        /// When set, upserts report `Unchanged` (a misbehaving store)
        wedge_upserts: bool,
    }

    impl MemStore {
        fn with_parts(parts: &[&str]) -> Self {
            let store = Self::default();
            store
                .parts
                .borrow_mut()
                .extend(parts.iter().map(|p| p.to_string()));
            store
        }

        fn quantity(&self, partno: &str) -> Option<i64> {
            self.entries.borrow().get(partno).map(|e| e.quantity)
        }

        fn set_bom_raw(&self, partno: &str, bom: &[(&str, u32)]) {
            let mut entries = self.entries.borrow_mut();
            let entry = entries
                .entry(partno.to_string())
                .or_insert_with(|| StockEntry::new(partno));
            entry.bom = bom
                .iter()
                .map(|(child, quantity)| BomLine {
                    partno: child.to_string(),
                    quantity: *quantity,
                })
                .collect();
        }
    }

    impl Catalog for MemStore {
        fn exists(&self, partno: &str) -> Result<bool, StoreError> {
            Ok(self.parts.borrow().contains(partno))
        }

        fn revision_count(&self, _partno: &str) -> Result<Option<usize>, StoreError> {
            Ok(Some(1))
        }
    }

    impl StockStore for MemStore {
        fn entry(&self, partno: &str) -> Result<Option<StockEntry>, StoreError> {
            Ok(self.entries.borrow().get(partno).cloned())
        }

        fn list_entries(&self) -> Result<Vec<StockEntry>, StoreError> {
            let mut entries: Vec<_> = self.entries.borrow().values().cloned().collect();
            entries.sort_by(|a, b| a.partno.cmp(&b.partno));
            Ok(entries)
        }

        fn increment_quantity(&self, partno: &str, delta: i64) -> Result<Upsert, StoreError> {
            if self.wedge_upserts {
                return Ok(Upsert::Unchanged);
            }
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(partno) {
                Some(entry) => {
                    entry.quantity += delta;
                    Ok(Upsert::Updated)
                }
                None => {
                    let mut entry = StockEntry::new(partno);
                    entry.quantity = delta;
                    entries.insert(partno.to_string(), entry);
                    Ok(Upsert::Created)
                }
            }
        }

        fn set_quantity(&self, partno: &str, quantity: i64) -> Result<Upsert, StoreError> {
            if self.wedge_upserts {
                return Ok(Upsert::Unchanged);
            }
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(partno) {
                Some(entry) => {
                    entry.quantity = quantity;
                    Ok(Upsert::Updated)
                }
                None => {
                    let mut entry = StockEntry::new(partno);
                    entry.quantity = quantity;
                    entries.insert(partno.to_string(), entry);
                    Ok(Upsert::Created)
                }
            }
        }

        fn replace_bom(&self, partno: &str, bom: Vec<BomLine>) -> Result<Upsert, StoreError> {
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(partno) {
                Some(entry) => {
                    entry.bom = bom;
                    Ok(Upsert::Updated)
                }
                None => {
                    let mut entry = StockEntry::new(partno);
                    entry.bom = bom;
                    entries.insert(partno.to_string(), entry);
                    Ok(Upsert::Created)
                }
            }
        }

        fn increment_batch(
            &self,
            partno: &str,
            batch: &str,
            quantity: i64,
        ) -> Result<Upsert, StoreError> {
            let mut batches = self.batches.borrow_mut();
            let key = (partno.to_string(), batch.to_string());
            let outcome = if batches.contains_key(&key) {
                Upsert::Updated
            } else {
                Upsert::Created
            };
            *batches.entry(key).or_insert(0) += quantity;
            Ok(outcome)
        }

        fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
            self.ledger.borrow_mut().push(record.clone());
            Ok(())
        }

        fn history(&self, partno: &str) -> Result<Vec<HistoryRecord>, StoreError> {
            Ok(self
                .ledger
                .borrow()
                .iter()
                .filter(|record| record.partno == partno)
                .cloned()
                .collect())
        }

        fn batches(&self, partno: &str) -> Result<Vec<BatchRecord>, StoreError> {
            Ok(self
                .batches
                .borrow()
                .iter()
                .filter(|((part, _), _)| part == partno)
                .map(|((part, name), quantity)| BatchRecord {
                    partno: part.clone(),
                    name: name.clone(),
                    quantity: *quantity,
                })
                .collect())
        }
    }

    #[test]
    fn test_conservation_single_edge() {
        let store = MemStore::with_parts(&["AB1234", "CH0001"]);
        store.set_bom_raw("AB1234", &[("CH0001", 3)]);
        let service = StockService::new(&store, &store);

        service.update_counts("AB1234", 5, None, "built").unwrap();

        assert_eq!(store.quantity("AB1234"), Some(5));
        assert_eq!(store.quantity("CH0001"), Some(-15));
    }

    #[test]
    fn test_zero_delta_is_a_noop() {
        let store = MemStore::with_parts(&["AB1234"]);
        let service = StockService::new(&store, &store);

        service.update_counts("AB1234", 0, Some("b1"), "nothing").unwrap();

        assert_eq!(store.quantity("AB1234"), None);
        assert!(store.ledger.borrow().is_empty());
    }

    #[test]
    fn test_negative_delta_does_not_propagate() {
        let store = MemStore::with_parts(&["AB1234", "CH0001"]);
        store.set_bom_raw("AB1234", &[("CH0001", 2)]);
        let service = StockService::new(&store, &store);

        service.update_counts("AB1234", -4, None, "shipped").unwrap();

        assert_eq!(store.quantity("AB1234"), Some(-4));
        assert_eq!(store.quantity("CH0001"), None);
        assert_eq!(store.history("AB1234").unwrap().len(), 1);
        assert!(store.history("CH0001").unwrap().is_empty());
    }

    #[test]
    fn test_cycle_rejected_without_mutation() {
        let store = MemStore::with_parts(&["AA0001", "BB0001"]);
        store.set_bom_raw("AA0001", &[("BB0001", 1)]);
        store.set_bom_raw("BB0001", &[("AA0001", 1)]);
        let service = StockService::new(&store, &store);

        assert!(matches!(
            service.validate_bom("AA0001"),
            Err(StockError::Cycle(_))
        ));
        assert!(matches!(
            service.validate_bom("BB0001"),
            Err(StockError::Cycle(_))
        ));

        let err = service.update_counts("AA0001", 3, None, "built").unwrap_err();
        assert!(matches!(err, StockError::Cycle(_)));
        assert_eq!(store.quantity("AA0001"), Some(0));
        assert_eq!(store.quantity("BB0001"), Some(0));
        assert!(store.ledger.borrow().is_empty());
    }

    #[test]
    fn test_self_loop_rejected() {
        let store = MemStore::with_parts(&["AA0001"]);
        store.set_bom_raw("AA0001", &[("AA0001", 1)]);
        let service = StockService::new(&store, &store);

        assert!(matches!(
            service.validate_bom("AA0001"),
            Err(StockError::Cycle(_))
        ));
    }

    #[test]
    fn test_diamond_is_legal() {
        let store = MemStore::with_parts(&["PP0001", "AA0001", "BB0001", "CC0001"]);
        store.set_bom_raw("PP0001", &[("AA0001", 1), ("BB0001", 1)]);
        store.set_bom_raw("AA0001", &[("CC0001", 1)]);
        store.set_bom_raw("BB0001", &[("CC0001", 1)]);
        let service = StockService::new(&store, &store);

        service.validate_bom("PP0001").unwrap();
        service.update_counts("PP0001", 1, None, "built").unwrap();

        // the shared leaf is consumed once per path
        assert_eq!(store.quantity("CC0001"), Some(-2));
    }

    #[test]
    fn test_validation_after_failed_validation_is_clean() {
        // a failed walk must not leave state behind that poisons the next one
        let store = MemStore::with_parts(&["AA0001", "BB0001", "PP0001", "CC0001"]);
        store.set_bom_raw("AA0001", &[("AA0001", 1)]);
        store.set_bom_raw("PP0001", &[("CC0001", 2)]);
        let service = StockService::new(&store, &store);

        assert!(service.validate_bom("AA0001").is_err());
        service.validate_bom("PP0001").unwrap();
    }

    #[test]
    fn test_unknown_child_rejected() {
        let store = MemStore::with_parts(&["AB1234"]);
        store.set_bom_raw("AB1234", &[("ZZ9999", 1)]);
        let service = StockService::new(&store, &store);

        let err = service.update_counts("AB1234", 1, None, "built").unwrap_err();
        assert!(matches!(err, StockError::UnknownPart(p) if p == "ZZ9999"));
    }

    #[test]
    fn test_unknown_root_rejected() {
        let store = MemStore::with_parts(&[]);
        let service = StockService::new(&store, &store);

        let err = service.update_counts("AB1234", 1, None, "built").unwrap_err();
        assert!(matches!(err, StockError::UnknownPart(_)));
    }

    #[test]
    fn test_batch_only_on_positive_top_level() {
        let store = MemStore::with_parts(&["AB1234", "CH0001"]);
        store.set_bom_raw("AB1234", &[("CH0001", 2)]);
        let service = StockService::new(&store, &store);

        service.update_counts("AB1234", 3, Some("b1"), "restock").unwrap();
        service.update_counts("AB1234", -1, Some("b1"), "shipped").unwrap();

        let batches = store.batches("AB1234").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 3);
        assert!(store.batches("CH0001").unwrap().is_empty());
    }

    #[test]
    fn test_empty_batch_name_is_ignored() {
        let store = MemStore::with_parts(&["AB1234"]);
        let service = StockService::new(&store, &store);

        service.update_counts("AB1234", 3, Some(""), "restock").unwrap();
        assert!(store.batches("AB1234").unwrap().is_empty());
    }

    #[test]
    fn test_update_batch_rejects_negative() {
        let store = MemStore::with_parts(&["AB1234"]);
        let service = StockService::new(&store, &store);

        assert!(matches!(
            service.update_batch("AB1234", "b1", -1),
            Err(StockError::NegativeBatch)
        ));
    }

    #[test]
    fn test_wedged_store_surfaces_storage_error() {
        let mut store = MemStore::with_parts(&["AB1234"]);
        store.wedge_upserts = true;
        let service = StockService::new(&store, &store);

        assert!(matches!(
            service.update_counts("AB1234", 1, None, "built"),
            Err(StockError::NoopUpsert(_))
        ));
        assert!(matches!(
            service.correct_counts("AB1234", 5, "fix"),
            Err(StockError::NoopUpsert(_))
        ));
    }

    #[test]
    fn test_correction_idempotence() {
        let store = MemStore::with_parts(&["AB1234"]);
        let service = StockService::new(&store, &store);

        service.correct_counts("AB1234", 5, "first count").unwrap();
        service.correct_counts("AB1234", 5, "second count").unwrap();

        assert_eq!(store.quantity("AB1234"), Some(5));
        let records = store.history("AB1234").unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.change, StockChange::Absolute { quantity: 5 });
        }
        assert_ne!(records[0].message, records[1].message);
    }

    #[test]
    fn test_correction_does_not_cascade() {
        let store = MemStore::with_parts(&["AB1234", "CH0001"]);
        store.set_bom_raw("AB1234", &[("CH0001", 2)]);
        let service = StockService::new(&store, &store);

        service.correct_counts("AB1234", 50, "inventory").unwrap();
        assert_eq!(store.quantity("CH0001"), None);
    }

    #[test]
    fn test_set_bom_replaces_wholesale() {
        let store = MemStore::with_parts(&["AB1234", "CH0001", "CH0002"]);
        store.set_bom_raw("AB1234", &[("CH0001", 1)]);
        let service = StockService::new(&store, &store);

        service
            .set_bom(
                "AB1234",
                &[("CH0002".to_string(), "4".to_string())],
            )
            .unwrap();

        let bom = store.entry("AB1234").unwrap().unwrap().bom;
        assert_eq!(bom.len(), 1);
        assert_eq!(bom[0].partno, "CH0002");
        assert_eq!(bom[0].quantity, 4);
    }

    #[test]
    fn test_set_bom_rejects_bad_multiplier() {
        let store = MemStore::with_parts(&["AB1234", "CH0001"]);
        let service = StockService::new(&store, &store);

        for bad in ["three", "", "0", "-2", "1.5"] {
            let err = service
                .set_bom("AB1234", &[("CH0001".to_string(), bad.to_string())])
                .unwrap_err();
            assert!(matches!(err, StockError::BadMultiplier(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_set_bom_rejects_unknown_child() {
        let store = MemStore::with_parts(&["AB1234"]);
        let service = StockService::new(&store, &store);

        let err = service
            .set_bom("AB1234", &[("ZZ9999".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(err, StockError::UnknownPart(p) if p == "ZZ9999"));
    }

    #[test]
    fn test_end_to_end_build() {
        let store = MemStore::with_parts(&["PP0001", "CC0001", "CC0002"]);
        let service = StockService::new(&store, &store);

        service.correct_counts("PP0001", 35, "initial").unwrap();
        service.correct_counts("CC0001", 100, "initial").unwrap();
        service.correct_counts("CC0002", 20, "initial").unwrap();
        service
            .set_bom(
                "PP0001",
                &[
                    ("CC0001".to_string(), "2".to_string()),
                    ("CC0002".to_string(), "1".to_string()),
                ],
            )
            .unwrap();

        service
            .update_counts("PP0001", 1, Some("b1"), "restock")
            .unwrap();

        assert_eq!(store.quantity("PP0001"), Some(36));
        assert_eq!(store.quantity("CC0001"), Some(98));
        assert_eq!(store.quantity("CC0002"), Some(19));

        let parent_records = store.history("PP0001").unwrap();
        let restock: Vec<_> = parent_records
            .iter()
            .filter(|r| r.message == "restock")
            .collect();
        assert_eq!(restock.len(), 1);
        assert_eq!(restock[0].change, StockChange::Delta { delta: 1 });

        let c1_records = store.history("CC0001").unwrap();
        let bom_rule: Vec<_> = c1_records
            .iter()
            .filter(|r| r.message == BOM_RULE_MESSAGE)
            .collect();
        assert_eq!(bom_rule.len(), 1);
        assert_eq!(bom_rule[0].change, StockChange::Delta { delta: -2 });

        let c2_records = store.history("CC0002").unwrap();
        let bom_rule: Vec<_> = c2_records
            .iter()
            .filter(|r| r.message == BOM_RULE_MESSAGE)
            .collect();
        assert_eq!(bom_rule.len(), 1);
        assert_eq!(bom_rule[0].change, StockChange::Delta { delta: -1 });

        let batches = store.batches("PP0001").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].name, "b1");
        assert_eq!(batches[0].quantity, 1);
        assert!(store.batches("CC0001").unwrap().is_empty());
        assert!(store.batches("CC0002").unwrap().is_empty());
    }

    #[test]
    fn test_deep_chain_propagates_multipliers() {
        let store = MemStore::with_parts(&["AA0001", "BB0001", "CC0001"]);
        store.set_bom_raw("AA0001", &[("BB0001", 2)]);
        store.set_bom_raw("BB0001", &[("CC0001", 3)]);
        let service = StockService::new(&store, &store);

        service.update_counts("AA0001", 2, None, "built").unwrap();

        assert_eq!(store.quantity("AA0001"), Some(2));
        assert_eq!(store.quantity("BB0001"), Some(-4));
        // the child consumption is negative, so the grandchild is untouched
        assert_eq!(store.quantity("CC0001"), None);
    }
}
