//! Deletion bookkeeping: tombstone first, then delete.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store::{delete_record_schema, BlockStore, StoreError, WriteMode};
use tracing::{debug, info};

/// Index holding deletion tombstones, shared by every currency.
pub const HISTORY_INDEX: &str = "history";

/// A deletion tombstone, kept after the target document is gone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecord {
    /// Index the deleted document lived in.
    pub index: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    /// Seconds since epoch, as reported by the requester.
    pub time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DeleteRecord {
    fn tombstone_id(&self) -> String {
        format!("{}:{}:{}:{}", self.index, self.kind, self.id, self.time)
    }
}

/// Thin CRUD wrapper around deletions. Not part of the sync engine.
pub struct HistoryService {
    store: Arc<dyn BlockStore>,
    analyzer: String,
}

impl HistoryService {
    pub fn new(store: Arc<dyn BlockStore>, analyzer: String) -> Self {
        Self { store, analyzer }
    }

    pub async fn create_index_if_not_exists(&self) -> Result<(), StoreError> {
        if !self.store.exists(HISTORY_INDEX).await? {
            info!(index = HISTORY_INDEX, "creating index");
            self.store
                .create_index(HISTORY_INDEX, &delete_record_schema(&self.analyzer))
                .await?;
        }
        Ok(())
    }

    /// Record `record` and delete the document it points at. Returns the
    /// tombstone id.
    ///
    /// The referenced index must exist. The tombstone is written and
    /// confirmed before the document goes away, so an interrupted call
    /// can leave a tombstone without a deletion, never the reverse.
    pub async fn apply_delete(&self, record: &DeleteRecord) -> Result<String, StoreError> {
        if !self.store.exists(&record.index).await? {
            return Err(StoreError::IndexNotFound(record.index.clone()));
        }
        self.create_index_if_not_exists().await?;

        let tombstone_id = record.tombstone_id();
        let payload = serde_json::to_vec(record)?;

        debug!(index = %record.index, id = %record.id, "deleting document");
        self.store
            .upsert_raw(HISTORY_INDEX, &tombstone_id, &payload, WriteMode::Wait)
            .await?;
        self.store.delete(&record.index, &record.id).await?;

        Ok(tombstone_id)
    }
}
