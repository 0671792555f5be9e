//! Shared doubles for the engine tests: a canned remote with per-peer
//! chains and failure knobs, a canned peer directory, and a harness that
//! wires them to a `MemoryStore`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use models::{Block, ChainParameters, Peer, PeerFilter};
use parking_lot::Mutex;
use remote::{ChainRemote, NetworkRemote, RemoteError};
use store::{BlockStore, MemoryStore};

use crate::indexer::BlockIndexer;
use crate::recovery::RecoveryEngine;
use crate::service::SyncService;
use crate::SyncSettings;

pub const CURRENCY: &str = "testnet";

pub fn peer(host: &str) -> Peer {
    Peer::new(host, 9330)
}

pub fn hash_for(number: u64) -> String {
    format!("0000{number:04X}")
}

pub fn block(number: u64, hash: &str) -> Block {
    Block {
        currency: CURRENCY.to_string(),
        number,
        hash: hash.to_string(),
        member_count: Some(3),
        monetary_mass: Some("1000".to_string()),
        members_changes: None,
        extra: serde_json::Map::new(),
    }
}

pub fn block_json(number: u64, hash: &str) -> Vec<u8> {
    block(number, hash).to_json().unwrap()
}

pub fn parameters() -> ChainParameters {
    ChainParameters {
        currency: CURRENCY.to_string(),
        extra: serde_json::Map::new(),
    }
}

/// Canned chain data one peer serves.
#[derive(Default)]
pub struct PeerChain {
    pub parameters: Option<ChainParameters>,
    pub head: Option<Block>,
    pub blocks: BTreeMap<u64, Vec<u8>>,
    /// Single-block fetches that fail with a transport error.
    pub fail_singles: HashSet<u64>,
    /// All batch fetches fail with a transport error.
    pub fail_batches: bool,
    /// All batch fetches are refused with a bad request.
    pub refuse_batches: bool,
}

impl PeerChain {
    /// A healthy chain serving blocks `0..=last` with `last` as head.
    pub fn with_blocks(last: u64) -> Self {
        let mut chain = PeerChain {
            parameters: Some(parameters()),
            ..PeerChain::default()
        };
        for number in 0..=last {
            chain.blocks.insert(number, block_json(number, &hash_for(number)));
        }
        chain.head = Some(block(last, &hash_for(last)));
        chain
    }

    /// Parameters and a head, but no block data at all.
    pub fn head_only(last: u64) -> Self {
        PeerChain {
            parameters: Some(parameters()),
            head: Some(block(last, &hash_for(last))),
            ..PeerChain::default()
        }
    }
}

/// Canned remote: per-host chains plus call accounting.
#[derive(Default)]
pub struct MockRemote {
    chains: Mutex<HashMap<String, PeerChain>>,
    pub single_calls: Mutex<Vec<(String, u64)>>,
    pub batch_calls: Mutex<Vec<(String, u64)>>,
    pub head_calls: AtomicU32,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chain(&self, host: &str, chain: PeerChain) {
        self.chains.lock().insert(host.to_string(), chain);
    }

    pub fn single_calls_for(&self, host: &str) -> usize {
        self.single_calls
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .count()
    }

    pub fn batch_calls_for(&self, host: &str) -> Vec<u64> {
        self.batch_calls
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, from)| *from)
            .collect()
    }
}

fn unreachable_host(host: &str) -> RemoteError {
    RemoteError::Transport(format!("no route to host [{host}]"))
}

#[async_trait]
impl ChainRemote for MockRemote {
    async fn parameters(&self, peer: &Peer) -> Result<Option<ChainParameters>, RemoteError> {
        let chains = self.chains.lock();
        let chain = chains
            .get(&peer.host)
            .ok_or_else(|| unreachable_host(&peer.host))?;
        Ok(chain.parameters.clone())
    }

    async fn current_block(&self, peer: &Peer) -> Result<Option<Block>, RemoteError> {
        self.head_calls.fetch_add(1, Ordering::Relaxed);
        let chains = self.chains.lock();
        let chain = chains
            .get(&peer.host)
            .ok_or_else(|| unreachable_host(&peer.host))?;
        Ok(chain.head.clone())
    }

    async fn block_json(&self, peer: &Peer, number: u64) -> Result<Vec<u8>, RemoteError> {
        self.single_calls.lock().push((peer.host.clone(), number));
        let chains = self.chains.lock();
        let chain = chains
            .get(&peer.host)
            .ok_or_else(|| unreachable_host(&peer.host))?;
        if chain.fail_singles.contains(&number) {
            return Err(RemoteError::Transport(format!(
                "injected failure for block #{number}"
            )));
        }
        chain
            .blocks
            .get(&number)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn blocks_json(
        &self,
        peer: &Peer,
        count: u32,
        from: u64,
    ) -> Result<Vec<Vec<u8>>, RemoteError> {
        self.batch_calls.lock().push((peer.host.clone(), from));
        let chains = self.chains.lock();
        let chain = chains
            .get(&peer.host)
            .ok_or_else(|| unreachable_host(&peer.host))?;
        if chain.fail_batches {
            return Err(RemoteError::Transport("injected batch failure".to_string()));
        }
        if chain.refuse_batches {
            return Err(RemoteError::BadRequest("count is too high".to_string()));
        }
        Ok(chain
            .blocks
            .range(from..from + u64::from(count))
            .map(|(_, payload)| payload.clone())
            .collect())
    }
}

/// Canned peer directory.
#[derive(Default)]
pub struct MockNetwork {
    peers: Mutex<Vec<Peer>>,
    pub calls: AtomicU32,
}

impl MockNetwork {
    pub fn with_peers(peers: Vec<Peer>) -> Self {
        Self {
            peers: Mutex::new(peers),
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NetworkRemote for MockNetwork {
    async fn find_peers(
        &self,
        _peer: &Peer,
        _filter: &PeerFilter,
    ) -> Result<Vec<Peer>, RemoteError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.peers.lock().clone())
    }
}

/// Store + remotes, wired the way the service wires them.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub remote: Arc<MockRemote>,
    pub network: Arc<MockNetwork>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            remote: Arc::new(MockRemote::new()),
            network: Arc::new(MockNetwork::default()),
        }
    }

    pub fn with_network(peers: Vec<Peer>) -> Self {
        Self {
            network: Arc::new(MockNetwork::with_peers(peers)),
            ..Self::new()
        }
    }

    pub fn indexer(&self, settings: SyncSettings) -> BlockIndexer {
        let store: Arc<dyn BlockStore> = self.store.clone();
        let remote: Arc<dyn ChainRemote> = self.remote.clone();
        BlockIndexer::new(store, remote, settings)
    }

    pub fn recovery(&self, settings: SyncSettings) -> RecoveryEngine {
        let remote: Arc<dyn ChainRemote> = self.remote.clone();
        let network: Arc<dyn NetworkRemote> = self.network.clone();
        RecoveryEngine::new(remote, network, self.indexer(settings))
    }

    pub fn service(&self, settings: SyncSettings) -> SyncService {
        let store: Arc<dyn BlockStore> = self.store.clone();
        let remote: Arc<dyn ChainRemote> = self.remote.clone();
        let network: Arc<dyn NetworkRemote> = self.network.clone();
        SyncService::new(store, remote, network, settings)
    }

    /// Preload the store with blocks `0..=last` and a matching head
    /// pointer, as a completed earlier run would have left it.
    pub async fn preload_blocks(&self, last: u64) {
        for number in 0..=last {
            self.store
                .upsert_raw(
                    CURRENCY,
                    &number.to_string(),
                    &block_json(number, &hash_for(number)),
                    store::WriteMode::Wait,
                )
                .await
                .unwrap();
        }
        self.store
            .upsert_raw(
                CURRENCY,
                store::CURRENT_ID,
                &block_json(last, &hash_for(last)),
                store::WriteMode::Wait,
            )
            .await
            .unwrap();
    }
}

pub fn sequential() -> SyncSettings {
    SyncSettings {
        bulk: false,
        ..SyncSettings::default()
    }
}

pub fn bulk(batch_size: u32) -> SyncSettings {
    SyncSettings {
        bulk: true,
        batch_size,
        ..SyncSettings::default()
    }
}
