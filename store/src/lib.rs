//! Persistence boundary for mirrored chain data.
//!
//! One logical index per currency. Block documents are keyed by their
//! number, plus one reserved `current` document holding the latest head.
//! Everything behind the [`BlockStore`] trait so the engine runs the same
//! against a real document store or the in-memory double.

pub mod memory;
pub mod schema;


use async_trait::async_trait;
use models::Block;
use thiserror::Error;

pub use memory::MemoryStore;
pub use schema::{block_schema, delete_record_schema, IndexSchema};

/// Reserved document id for the per-currency head pointer. Distinct from
/// every real block number.
pub const CURRENT_ID: &str = "current";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index [{0}] not found")]
    IndexNotFound(String),
    #[error("document [{index}/{id}] not found")]
    DocumentNotFound { index: String, id: String },
    #[error("document [{index}/{id}] already exists")]
    DuplicateId { index: String, id: String },
    /// Write-admission control turned the request away; retry later.
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("invalid stored JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("store failure: {0}")]
    Technical(String),
}

/// Whether an upsert must be confirmed before returning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Block until the write has landed. Used whenever later logic reads
    /// the document back.
    Wait,
    /// Fire and forget. May be rejected under write pressure.
    Detached,
}

/// One document of a batch write.
#[derive(Clone, Debug)]
pub struct BulkItem {
    pub id: String,
    pub payload: Vec<u8>,
}

/// Per-item outcome of a batch write.
#[derive(Clone, Debug)]
pub struct BulkItemReport {
    pub id: String,
    pub failure: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct BulkReport {
    pub items: Vec<BulkItemReport>,
}

impl BulkReport {
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.failure.is_some())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItemReport> {
        self.items.iter().filter(|item| item.failure.is_some())
    }
}

/// Document store holding one index per currency.
///
/// Upserts are idempotent by `(index, id)`: a second write with the same
/// key overwrites the first.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn exists(&self, currency: &str) -> Result<bool, StoreError>;

    async fn create_index(&self, currency: &str, schema: &IndexSchema) -> Result<(), StoreError>;

    /// Drop a currency's index and all its data, head pointer included.
    async fn delete_index(&self, currency: &str) -> Result<(), StoreError>;

    /// Point lookup by document id (a block number or a reserved alias).
    async fn block_by_id(&self, currency: &str, id: &str) -> Result<Option<Block>, StoreError>;

    /// Point lookup by block number.
    async fn block_by_number(&self, currency: &str, number: u64) -> Result<Option<Block>, StoreError> {
        self.block_by_id(currency, &number.to_string()).await
    }

    /// The head pointer, if one has been written.
    async fn current_block(&self, currency: &str) -> Result<Option<Block>, StoreError> {
        self.block_by_id(currency, CURRENT_ID).await
    }

    /// Highest indexed block number; `None` when the index holds no blocks.
    async fn max_block_number(&self, currency: &str) -> Result<Option<u64>, StoreError>;

    async fn upsert_raw(
        &self,
        currency: &str,
        id: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), StoreError>;

    /// One atomic batch write; the report carries per-item outcomes.
    async fn bulk_upsert(&self, currency: &str, items: Vec<BulkItem>)
        -> Result<BulkReport, StoreError>;

    async fn delete(&self, currency: &str, id: &str) -> Result<(), StoreError>;
}
