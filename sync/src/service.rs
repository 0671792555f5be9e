//! Top-level synchronization entry point.

use std::sync::Arc;
use std::time::Instant;

use models::{Peer, Progression, RunStatus};
use remote::{ChainRemote, NetworkRemote};
use store::{block_schema, BlockStore};
use tracing::{debug, error, info, warn};

use crate::config::{self, SyncSettings};
use crate::indexer::BlockIndexer;
use crate::missing::MissingSet;
use crate::recovery::{RecoveryEngine, RecoveryOutcome};
use crate::SyncError;

/// Drives one synchronization run against a peer.
///
/// Every collaborator is injected at construction: a service cannot
/// exist without its store and remote handles, so it cannot be invoked
/// before they are available.
pub struct SyncService {
    store: Arc<dyn BlockStore>,
    remote: Arc<dyn ChainRemote>,
    settings: SyncSettings,
    indexer: BlockIndexer,
    recovery: RecoveryEngine,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn BlockStore>,
        remote: Arc<dyn ChainRemote>,
        network: Arc<dyn NetworkRemote>,
        settings: SyncSettings,
    ) -> Self {
        let indexer = BlockIndexer::new(store.clone(), remote.clone(), settings.clone());
        let recovery = RecoveryEngine::new(remote.clone(), network, indexer.clone());
        Self {
            store,
            remote,
            settings,
            indexer,
            recovery,
        }
    }

    /// Catch the store up with `peer`'s head.
    ///
    /// Mutates `progression` throughout and leaves the final status
    /// there. Failures are logged and reported through the status, never
    /// raised.
    pub async fn sync(&self, peer: &Peer, progression: &Progression) {
        progression.set_status(RunStatus::Running);
        progression.set_total(100);
        let started = Instant::now();

        if let Err(e) = self.run(peer, progression, started).await {
            error!(peer = %peer, error = %e, "error while indexing blocks from node");
            progression.set_status(RunStatus::Failed);
        }
    }

    async fn run(
        &self,
        peer: &Peer,
        progression: &Progression,
        started: Instant,
    ) -> Result<(), SyncError> {
        let parameters = match self.remote.parameters(peer).await {
            Ok(Some(parameters)) => parameters,
            Ok(None) => {
                error!(peer = %peer, "could not connect to node");
                progression.set_status(RunStatus::Failed);
                return Ok(());
            }
            Err(e) => {
                error!(peer = %peer, error = %e, "could not connect to node");
                progression.set_status(RunStatus::Failed);
                return Ok(());
            }
        };
        let currency = parameters.currency;

        let task = format!("Indexing blockchain [{currency}] from peer [{peer}]");
        progression.set_task(task.as_str());
        info!("{task}");

        if !self.store.exists(&currency).await? {
            info!(currency = %currency, "creating index");
            self.store.create_index(&currency, &block_schema()).await?;
        }

        let current = match self.remote.current_block(peer).await? {
            Some(current) => current,
            None => {
                error!(peer = %peer, "peer has no current block");
                progression.set_status(RunStatus::Failed);
                return Ok(());
            }
        };

        let mut max_number = current.number;
        if self.settings.dev_mode && max_number > config::DEV_MODE_MAX_NUMBER {
            max_number = config::DEV_MODE_MAX_NUMBER;
        }

        let start_number = self.resolve_start(&currency).await?;

        if start_number > max_number {
            debug!(peer = %peer, head = max_number, "current block is up to date");
            progression.set_status(RunStatus::Success);
            return Ok(());
        }

        let missing = self
            .indexer
            .index_range(peer, &currency, start_number, max_number, progression)
            .await?;

        if progression.status() == RunStatus::Stopped {
            return Ok(());
        }

        let missing = if missing.is_empty() {
            missing
        } else {
            progression.set_task(format!(
                "Indexing blockchain [{currency}] from other peers"
            ));
            match self
                .recovery
                .recover(peer, &current, missing, 1, progression)
                .await?
            {
                RecoveryOutcome::Resolved => MissingSet::default(),
                RecoveryOutcome::Cancelled => {
                    progression.set_status(RunStatus::Stopped);
                    return Ok(());
                }
                RecoveryOutcome::Unresolved(rest) => rest,
            }
        };

        if missing.is_empty() {
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "all blocks indexed"
            );
            progression.set_status(RunStatus::Success);
        } else {
            warn!(count = missing.len(), "could not index all blocks");
            progression.set_status(RunStatus::Failed);
        }

        Ok(())
    }

    /// Where to resume: after a trusted head pointer, else after the
    /// highest indexed number, else from genesis.
    async fn resolve_start(&self, currency: &str) -> Result<u64, SyncError> {
        let mut start: u64 = 0;

        if let Some(head) = self.store.current_block(currency).await? {
            // The pointer is only trusted when its block actually landed.
            if self
                .store
                .block_by_number(currency, head.number)
                .await?
                .is_some()
            {
                start = head.number + 1;
            }
        }

        if start <= 1 {
            start = match self.store.max_block_number(currency).await? {
                Some(max) => max + 1,
                None => 0,
            };
        }

        Ok(start)
    }

    /// Direct access to the indexer for hosts that save or create single
    /// blocks outside a run (e.g. a new-block listener).
    pub fn indexer(&self) -> &BlockIndexer {
        &self.indexer
    }
}
