//! Remote node boundary: everything the mirror needs from a peer.
//!
//! The traits are the contract; [`HttpRemote`] is the stock JSON-over-HTTP
//! implementation. Tests substitute their own impls.

pub mod http;

use async_trait::async_trait;
use models::{Block, ChainParameters, Peer, PeerFilter};
use thiserror::Error;

pub use http::HttpRemote;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Peer unreachable, connection dropped, or an unexpected status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Peer explicitly refused the request (e.g. range too large).
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    /// Peer answered with something that is not valid JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl RemoteError {
    /// Technical failures are worth retrying against another peer; a bad
    /// request is not.
    pub fn is_technical(&self) -> bool {
        matches!(self, RemoteError::Transport(_) | RemoteError::Malformed(_))
    }
}

/// Read access to one peer's chain.
#[async_trait]
pub trait ChainRemote: Send + Sync {
    /// Chain parameters, `None` when the peer does not serve them.
    async fn parameters(&self, peer: &Peer) -> Result<Option<ChainParameters>, RemoteError>;

    /// The peer's current head block, `None` when the chain is empty.
    async fn current_block(&self, peer: &Peer) -> Result<Option<Block>, RemoteError>;

    /// One block as its raw JSON payload.
    async fn block_json(&self, peer: &Peer, number: u64) -> Result<Vec<u8>, RemoteError>;

    /// Up to `count` blocks starting at `from`, as raw JSON payloads.
    /// Peers may return fewer than requested, in any order.
    async fn blocks_json(
        &self,
        peer: &Peer,
        count: u32,
        from: u64,
    ) -> Result<Vec<Vec<u8>>, RemoteError>;
}

/// Peer discovery.
#[async_trait]
pub trait NetworkRemote: Send + Sync {
    /// Peers known to `peer`, narrowed by `filter`.
    ///
    /// Implementations apply the status and endpoint criteria only. The
    /// `number`/`hash` head criteria are accepted but not applied yet;
    /// applying them would change the peer-selection order callers
    /// observe, so tightening is deliberate when it happens.
    async fn find_peers(&self, peer: &Peer, filter: &PeerFilter) -> Result<Vec<Peer>, RemoteError>;
}
