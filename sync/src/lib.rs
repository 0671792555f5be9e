//! Block synchronization engine.
//!
//! Keeps a local store aligned with the head of a peer-to-peer ledger:
//!
//! - **Block Indexer**: writes fetched payloads into the store, one by
//!   one or in batches, and reports the numbers it could not place
//! - **Recovery Engine**: walks alternate peers to resolve missing
//!   blocks, with a bounded retry loop and fixed backoff
//! - **Sync Service**: the entry point; resolves the resume point, drives
//!   the indexer, escalates gaps to recovery, and maintains the shared
//!   progression record
//!
//! The store and remote-node boundaries are traits ([`store::BlockStore`],
//! [`remote::ChainRemote`]) so the engine runs the same against a live
//! peer or the in-memory doubles.

pub mod config;
pub mod indexer;
pub mod missing;
pub mod recovery;
pub mod service;

pub use config::SyncSettings;
pub use indexer::BlockIndexer;
pub use missing::{MissingSet, MissingToken};
pub use recovery::{RecoveryEngine, RecoveryOutcome};
pub use service::SyncService;

use remote::RemoteError;
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("invalid block payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("block #{number} already exists in [{currency}]")]
    DuplicateBlock { currency: String, number: u64 },
    #[error("invalid argument: {0}")]
    Precondition(String),
}

#[cfg(test)]
mod tests;
