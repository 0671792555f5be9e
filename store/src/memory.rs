//! In-memory store, used by the test suites and for dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use models::Block;
use parking_lot::Mutex;

use crate::{
    BlockStore, BulkItem, BulkItemReport, BulkReport, IndexSchema, StoreError, WriteMode,
};

#[derive(Debug)]
struct IndexData {
    #[allow(dead_code)]
    schema: Option<IndexSchema>,
    docs: BTreeMap<String, Vec<u8>>,
}

/// `BlockStore` backed by process memory.
///
/// Carries a couple of failure-injection knobs so tests can exercise the
/// write-rejection and partial-bulk paths without a real cluster.
#[derive(Default)]
pub struct MemoryStore {
    indices: Mutex<HashMap<String, IndexData>>,
    writes: AtomicU64,
    reject_detached: AtomicU32,
    bulk_failures: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Bounce the next `n` detached writes with `Rejected`.
    pub fn reject_next_detached(&self, n: u32) {
        self.reject_detached.store(n, Ordering::Relaxed);
    }

    /// Fail bulk writes for the given document ids.
    pub fn fail_bulk_ids<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.bulk_failures.lock().extend(ids);
    }

    fn put(&self, currency: &str, id: &str, payload: &[u8]) {
        let mut indices = self.indices.lock();
        let index = indices.entry(currency.to_string()).or_insert_with(|| IndexData {
            schema: None,
            docs: BTreeMap::new(),
        });
        index.docs.insert(id.to_string(), payload.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn exists(&self, currency: &str) -> Result<bool, StoreError> {
        Ok(self.indices.lock().contains_key(currency))
    }

    async fn create_index(&self, currency: &str, schema: &IndexSchema) -> Result<(), StoreError> {
        let mut indices = self.indices.lock();
        if indices.contains_key(currency) {
            return Err(StoreError::Technical(format!(
                "index [{currency}] already exists"
            )));
        }
        indices.insert(
            currency.to_string(),
            IndexData {
                schema: Some(schema.clone()),
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, currency: &str) -> Result<(), StoreError> {
        self.indices
            .lock()
            .remove(currency)
            .map(|_| ())
            .ok_or_else(|| StoreError::IndexNotFound(currency.to_string()))
    }

    async fn block_by_id(&self, currency: &str, id: &str) -> Result<Option<Block>, StoreError> {
        let payload = self
            .indices
            .lock()
            .get(currency)
            .and_then(|index| index.docs.get(id).cloned());

        match payload {
            Some(bytes) => Ok(Some(Block::from_json(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn max_block_number(&self, currency: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.indices.lock().get(currency).and_then(|index| {
            index
                .docs
                .keys()
                .filter_map(|id| id.parse::<u64>().ok())
                .max()
        }))
    }

    async fn upsert_raw(
        &self,
        currency: &str,
        id: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        if mode == WriteMode::Detached {
            let remaining = self.reject_detached.load(Ordering::Relaxed);
            if remaining > 0 {
                self.reject_detached.store(remaining - 1, Ordering::Relaxed);
                return Err(StoreError::Rejected("write queue saturated".to_string()));
            }
        }
        self.put(currency, id, payload);
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        currency: &str,
        items: Vec<BulkItem>,
    ) -> Result<BulkReport, StoreError> {
        let mut report = BulkReport::default();
        for item in items {
            let failure = {
                let failures = self.bulk_failures.lock();
                failures.contains(&item.id)
            };
            if failure {
                report.items.push(BulkItemReport {
                    id: item.id,
                    failure: Some("injected bulk failure".to_string()),
                });
            } else {
                self.put(currency, &item.id, &item.payload);
                report.items.push(BulkItemReport {
                    id: item.id,
                    failure: None,
                });
            }
        }
        Ok(report)
    }

    async fn delete(&self, currency: &str, id: &str) -> Result<(), StoreError> {
        let mut indices = self.indices.lock();
        let index = indices
            .get_mut(currency)
            .ok_or_else(|| StoreError::IndexNotFound(currency.to_string()))?;
        index
            .docs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::DocumentNotFound {
                index: currency.to_string(),
                id: id.to_string(),
            })
    }
}
