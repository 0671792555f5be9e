//! Writes fetched block payloads into the store.

use std::sync::Arc;
use std::time::Duration;

use models::{Block, Peer, Progression, RunStatus};
use rand::Rng;
use remote::{ChainRemote, RemoteError};
use store::{BlockStore, BulkItem, StoreError, WriteMode, CURRENT_ID};
use tracing::{debug, info, trace};

use crate::config::{self, SyncSettings};
use crate::missing::{MissingSet, MissingToken};
use crate::SyncError;

/// Writes blocks into the store, sequentially or in batches, and reports
/// the numbers it could not place. A failed block never aborts a range.
#[derive(Clone)]
pub struct BlockIndexer {
    store: Arc<dyn BlockStore>,
    remote: Arc<dyn ChainRemote>,
    settings: SyncSettings,
}

impl BlockIndexer {
    pub fn new(
        store: Arc<dyn BlockStore>,
        remote: Arc<dyn ChainRemote>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            remote,
            settings,
        }
    }

    /// Index `[first, last]` from `peer` with the configured mode.
    pub async fn index_range(
        &self,
        peer: &Peer,
        currency: &str,
        first: u64,
        last: u64,
        progression: &Progression,
    ) -> Result<MissingSet, SyncError> {
        if self.settings.bulk {
            self.index_range_bulk(peer, currency, first, last, progression)
                .await
        } else {
            self.index_range_sequential(peer, currency, first, last, progression)
                .await
        }
    }

    /// One fetch and one confirmed write per number. A number that cannot
    /// be fetched or written is recorded and the scan moves on.
    pub async fn index_range_sequential(
        &self,
        peer: &Peer,
        currency: &str,
        first: u64,
        last: u64,
        progression: &Progression,
    ) -> Result<MissingSet, SyncError> {
        let mut missing = MissingSet::default();

        for number in first..=last {
            if number != 0 && number % config::CANCEL_CHECK_INTERVAL == 0 {
                if progression.is_cancelled() {
                    progression.set_status(RunStatus::Stopped);
                    info!(currency, peer = %peer, "indexing stopped");
                    return Ok(missing);
                }
                report_progress(progression, currency, peer, first, last, number);
            }

            match self.fetch_and_save(peer, currency, number).await {
                Ok((block, payload)) => {
                    if last > 0 && number == last - 1 {
                        self.index_current_if_changed(currency, &block, &payload, WriteMode::Wait)
                            .await?;
                    }
                }
                Err(e) => {
                    debug!(number, error = %e, "error while getting block, skipping it");
                    missing.insert(MissingToken::Single(number));
                }
            }
        }

        Ok(missing)
    }

    async fn fetch_and_save(
        &self,
        peer: &Peer,
        currency: &str,
        number: u64,
    ) -> Result<(Block, Vec<u8>), SyncError> {
        let payload = self.remote.block_json(peer, number).await?;
        let block = Block::from_json(&payload)?;
        self.save_block(&block, false, true).await?;
        Ok((block, payload))
    }

    /// Batched indexing over `[first, last]`.
    ///
    /// The cursor advances to the highest number actually received, which
    /// tolerates peers returning fewer payloads than asked, or out of
    /// order. An empty or refused batch marks the whole requested
    /// sub-range missing and still advances by the batch size, so the
    /// scan cannot stall on one silent peer.
    pub async fn index_range_bulk(
        &self,
        peer: &Peer,
        currency: &str,
        first: u64,
        last: u64,
        progression: &Progression,
    ) -> Result<MissingSet, SyncError> {
        let mut missing = MissingSet::default();
        let batch_size = self.settings.batch_size.max(1);
        let mut current_payload: Option<Vec<u8>> = None;
        let mut cursor = first;

        while cursor < last {
            if progression.is_cancelled() {
                progression.set_status(RunStatus::Stopped);
                info!(currency, peer = %peer, "indexing stopped");
                return Ok(missing);
            }

            let payloads = match self.remote.blocks_json(peer, batch_size, cursor).await {
                Ok(payloads) => payloads,
                Err(RemoteError::BadRequest(reason)) => {
                    debug!(
                        from = cursor,
                        count = batch_size,
                        reason = %reason,
                        "batch refused, skipping blocks"
                    );
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            };

            if payloads.is_empty() {
                missing.insert(MissingToken::Range {
                    first: cursor,
                    last: cursor + u64::from(batch_size),
                });
                cursor += u64::from(batch_size);
            } else {
                let mut seen: Vec<u64> = Vec::with_capacity(payloads.len());
                let mut items: Vec<BulkItem> = Vec::with_capacity(payloads.len());

                for payload in &payloads {
                    let number = Block::peek_number(payload)?;

                    if number > cursor {
                        cursor = number;
                    }

                    if !seen.contains(&number) {
                        items.push(BulkItem {
                            id: number.to_string(),
                            payload: payload.clone(),
                        });
                        seen.push(number);
                    }

                    // The payload for the range end doubles as the head
                    // pointer once the whole range is done.
                    if number == last {
                        current_payload = Some(payload.clone());
                    }
                }

                if !items.is_empty() {
                    let report = self.store.bulk_upsert(currency, items).await?;
                    for item in report.failures() {
                        if item.id == CURRENT_ID {
                            continue;
                        }
                        let Ok(number) = item.id.parse::<u64>() else {
                            continue;
                        };
                        if missing.insert(MissingToken::Single(number)) {
                            debug!(
                                number,
                                failure = item.failure.as_deref().unwrap_or(""),
                                "error while indexing block, skipping it"
                            );
                        }
                    }
                }
            }

            report_progress(progression, currency, peer, first, last, cursor);
        }

        if let Some(payload) = current_payload {
            self.index_current(currency, &payload, WriteMode::Detached)
                .await?;
        }

        Ok(missing)
    }

    /// Create or update a block depending on its existence and hash.
    ///
    /// Returns whether a write happened. With `update_when_same_hash`
    /// false, an existing block whose hash is unchanged is left alone.
    pub async fn save_block(
        &self,
        block: &Block,
        update_when_same_hash: bool,
        wait: bool,
    ) -> Result<bool, SyncError> {
        check_block(block)?;

        let existing = self
            .store
            .block_by_number(&block.currency, block.number)
            .await?;

        let do_update = match &existing {
            None => {
                trace!(number = block.number, "insert new block");
                true
            }
            Some(_) if update_when_same_hash => {
                trace!(number = block.number, "update block");
                true
            }
            Some(prev) => {
                let changed = prev.hash != block.hash;
                if changed {
                    trace!(
                        number = block.number,
                        old = %prev.hash,
                        new = %block.hash,
                        "hash has changed, updating block"
                    );
                } else {
                    trace!(number = block.number, "hash is up to date, skipping");
                }
                changed
            }
        };

        if do_update {
            let payload = block.to_json()?;
            self.index_block(&block.currency, block.number, &payload, wait)
                .await?;
        }

        Ok(do_update)
    }

    /// Insert a block that must not already exist. Use [`Self::save_block`]
    /// for upsert semantics.
    pub async fn create_block(&self, block: &Block) -> Result<(), SyncError> {
        check_block(block)?;

        if self
            .store
            .block_by_number(&block.currency, block.number)
            .await?
            .is_some()
        {
            return Err(SyncError::DuplicateBlock {
                currency: block.currency.clone(),
                number: block.number,
            });
        }

        let payload = block.to_json()?;
        self.index_block(&block.currency, block.number, &payload, false)
            .await
    }

    /// Raw upsert of one payload under its number.
    pub async fn index_block(
        &self,
        currency: &str,
        number: u64,
        payload: &[u8],
        wait: bool,
    ) -> Result<(), SyncError> {
        if payload.is_empty() {
            return Err(SyncError::Precondition(
                "block payload must not be empty".to_string(),
            ));
        }
        let mode = if wait {
            WriteMode::Wait
        } else {
            WriteMode::Detached
        };
        self.store
            .upsert_raw(currency, &number.to_string(), payload, mode)
            .await?;
        Ok(())
    }

    /// Upsert the head pointer unless it already points at this hash.
    pub async fn index_current_if_changed(
        &self,
        currency: &str,
        block: &Block,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), SyncError> {
        let existing = self.store.current_block(currency).await?;
        if existing.map_or(true, |current| current.hash != block.hash) {
            self.index_current(currency, payload, mode).await?;
        }
        Ok(())
    }

    /// Upsert the head pointer. Detached writes absorb write-admission
    /// rejections with a bounded, jittered retry; exhausting it surfaces
    /// the rejection.
    pub async fn index_current(
        &self,
        currency: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), SyncError> {
        if payload.is_empty() {
            return Err(SyncError::Precondition(
                "current block payload must not be empty".to_string(),
            ));
        }

        match mode {
            WriteMode::Wait => {
                self.store
                    .upsert_raw(currency, CURRENT_ID, payload, WriteMode::Wait)
                    .await?;
                Ok(())
            }
            WriteMode::Detached => {
                let mut last_rejection = String::new();
                for _ in 0..config::DETACHED_RETRY_ATTEMPTS {
                    match self
                        .store
                        .upsert_raw(currency, CURRENT_ID, payload, WriteMode::Detached)
                        .await
                    {
                        Err(StoreError::Rejected(reason)) => {
                            let jitter = rand::thread_rng().gen_range(0..config::DETACHED_RETRY_JITTER_MS);
                            tokio::time::sleep(
                                config::DETACHED_RETRY_DELAY + Duration::from_millis(jitter),
                            )
                            .await;
                            last_rejection = reason;
                        }
                        result => return result.map_err(SyncError::from),
                    }
                }
                Err(SyncError::Store(StoreError::Rejected(last_rejection)))
            }
        }
    }
}

fn check_block(block: &Block) -> Result<(), SyncError> {
    if block.currency.trim().is_empty() {
        return Err(SyncError::Precondition(
            "block attribute 'currency' must not be blank".to_string(),
        ));
    }
    if block.hash.trim().is_empty() {
        return Err(SyncError::Precondition(
            "block attribute 'hash' must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// Percentage report against the shared progression record.
pub(crate) fn report_progress(
    progression: &Progression,
    currency: &str,
    peer: &Peer,
    first: u64,
    last: u64,
    current: u64,
) {
    if last <= first {
        return;
    }
    let pct = (current.saturating_sub(first) * 100 / (last - first)).min(100);
    progression.set_current(pct);

    let message = format!("[{currency}] [{peer}] indexing block #{current}/{last} ({pct}%)");
    progression.set_message(message.as_str());
    info!("{message}");
}
