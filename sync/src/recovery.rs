//! Resolves missing blocks by walking alternate peers.

use std::sync::Arc;
use std::time::Duration;

use models::{Block, EndpointKind, Peer, PeerFilter, Progression};
use remote::{ChainRemote, NetworkRemote, RemoteError};
use tracing::{debug, error, info};

use crate::config;
use crate::indexer::BlockIndexer;
use crate::missing::{MissingSet, MissingToken};
use crate::SyncError;

/// What a recovery pass ended with.
#[derive(Clone, Debug, PartialEq)]
pub enum RecoveryOutcome {
    /// Every token was resolved.
    Resolved,
    /// Cancelled while waiting between attempts; no result.
    Cancelled,
    /// Attempts exhausted; these tokens are permanently missing.
    Unresolved(MissingSet),
}

/// Bounded peer-fan-out retry loop.
///
/// Each attempt walks the peer list once, trying every outstanding token
/// against every candidate until the set drains. Between attempts it
/// sleeps a fixed interval and refreshes the head from the seed peer.
/// The dominant failure mode is a transiently lagging peer, so fixed
/// delay plus peer rotation converges faster here than escalating
/// backoff against a single peer.
pub struct RecoveryEngine {
    remote: Arc<dyn ChainRemote>,
    network: Arc<dyn NetworkRemote>,
    indexer: BlockIndexer,
}

impl RecoveryEngine {
    pub fn new(
        remote: Arc<dyn ChainRemote>,
        network: Arc<dyn NetworkRemote>,
        indexer: BlockIndexer,
    ) -> Self {
        Self {
            remote,
            network,
            indexer,
        }
    }

    /// Try to resolve `missing`, starting at `attempt` (>= 1).
    pub async fn recover(
        &self,
        peer: &Peer,
        current_head: &Block,
        missing: MissingSet,
        attempt: u32,
        progression: &Progression,
    ) -> Result<RecoveryOutcome, SyncError> {
        if missing.is_empty() {
            return Err(SyncError::Precondition(
                "missing set must not be empty".to_string(),
            ));
        }
        if attempt < 1 {
            return Err(SyncError::Precondition(
                "retry attempt must be >= 1".to_string(),
            ));
        }
        if current_head.hash.trim().is_empty() {
            return Err(SyncError::Precondition(
                "current head hash must not be blank".to_string(),
            ));
        }

        let mut head = current_head.clone();
        let mut outstanding = missing;
        let mut attempt = attempt;

        loop {
            debug!(tokens = ?outstanding, "missing blocks");

            let filter = PeerFilter::endpoint(EndpointKind::BlockApi);
            let peers = self.network.find_peers(peer, &filter).await?;

            for candidate in &peers {
                info!(
                    currency = %head.currency,
                    peer = %candidate,
                    "trying to get missing blocks from other peer"
                );
                if let Err(e) = self.try_peer(candidate, &head.currency, &mut outstanding).await {
                    debug!(peer = %candidate, error = %e, "error while getting blocks from peer, skipping it");
                    continue;
                }
                if outstanding.is_empty() {
                    break;
                }
            }

            if outstanding.is_empty() {
                return Ok(RecoveryOutcome::Resolved);
            }

            attempt += 1;
            if attempt >= config::MAX_RECOVERY_ATTEMPTS {
                error!(
                    attempts = config::MAX_RECOVERY_ATTEMPTS,
                    tokens = ?outstanding,
                    "some blocks are still missing, giving up"
                );
                return Ok(RecoveryOutcome::Unresolved(outstanding));
            }

            debug!(
                tokens = ?outstanding,
                attempt,
                max = config::MAX_RECOVERY_ATTEMPTS,
                "some blocks are still missing, will retry after backoff"
            );
            if !self.backoff(progression).await {
                return Ok(RecoveryOutcome::Cancelled);
            }

            head = match self.remote.current_block(peer).await? {
                Some(block) => block,
                None => {
                    return Err(SyncError::Remote(RemoteError::Transport(
                        "seed peer no longer serves a current block".to_string(),
                    )))
                }
            };
        }
    }

    /// One pass of every outstanding token against one peer. Any error
    /// here is peer-level: the caller skips to the next candidate.
    async fn try_peer(
        &self,
        peer: &Peer,
        currency: &str,
        outstanding: &mut MissingSet,
    ) -> Result<(), SyncError> {
        for token in outstanding.clone() {
            match token {
                MissingToken::Range { first, last } => {
                    // Fresh range-scoped pass; the token only leaves the
                    // set once the pass went through, and any sub-gaps it
                    // reveals go back in.
                    let rest = self
                        .indexer
                        .index_range_bulk(peer, currency, first, last, &Progression::new())
                        .await?;
                    outstanding.shift_remove(&token);
                    outstanding.extend(rest);
                }
                MissingToken::Single(number) => {
                    let payload = self.remote.block_json(peer, number).await?;
                    if !payload.is_empty() {
                        debug!(number, peer = %peer, "found missing block on peer");
                        self.indexer
                            .index_block(currency, number, &payload, true)
                            .await?;
                        outstanding.shift_remove(&token);
                    }
                }
            }
        }
        Ok(())
    }

    /// Fixed-interval wait, polled against the cancel flag once a second.
    /// Returns false when cancelled.
    async fn backoff(&self, progression: &Progression) -> bool {
        for _ in 0..config::RECOVERY_BACKOFF.as_secs() {
            if progression.is_cancelled() {
                return false;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        !progression.is_cancelled()
    }
}
