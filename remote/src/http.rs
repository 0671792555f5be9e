//! reqwest-backed implementation of the remote traits.

use std::time::Duration;

use async_trait::async_trait;
use models::{Block, ChainParameters, Peer, PeerFilter, Protocol};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{ChainRemote, NetworkRemote, RemoteError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP JSON client for the peer wire contract.
///
/// Endpoints, relative to `protocol://host:port`:
/// `/blockchain/parameters`, `/blockchain/current`,
/// `/blockchain/block/{number}`, `/blockchain/blocks/{count}/{from}`,
/// `/network/peers`.
pub struct HttpRemote {
    client: Client,
}

impl HttpRemote {
    pub fn new() -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Response, RemoteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::BadRequest(body))
        } else if status == StatusCode::NOT_FOUND {
            Err(RemoteError::NotFound)
        } else {
            Err(RemoteError::Transport(format!(
                "unexpected status {status} from {url}"
            )))
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ChainRemote for HttpRemote {
    async fn parameters(&self, peer: &Peer) -> Result<Option<ChainParameters>, RemoteError> {
        let url = format!("{}/blockchain/parameters", peer.url());
        match self.get_bytes(&url).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn current_block(&self, peer: &Peer) -> Result<Option<Block>, RemoteError> {
        let url = format!("{}/blockchain/current", peer.url());
        match self.get_bytes(&url).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn block_json(&self, peer: &Peer, number: u64) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/blockchain/block/{number}", peer.url());
        let bytes = self.get_bytes(&url).await?;
        // A payload that is not JSON is a malformed answer, not a miss.
        let _: serde::de::IgnoredAny = serde_json::from_slice(&bytes)?;
        Ok(bytes)
    }

    async fn blocks_json(
        &self,
        peer: &Peer,
        count: u32,
        from: u64,
    ) -> Result<Vec<Vec<u8>>, RemoteError> {
        let url = format!("{}/blockchain/blocks/{count}/{from}", peer.url());
        let bytes = self.get_bytes(&url).await?;
        let values: Vec<Value> = serde_json::from_slice(&bytes)?;
        values
            .into_iter()
            .map(|value| serde_json::to_vec(&value).map_err(RemoteError::from))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PeersEnvelope {
    peers: Vec<PeerRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerRecord {
    host: String,
    port: u16,
    #[serde(default)]
    protocol: Protocol,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    endpoints: Vec<String>,
}

fn apply_filter(records: Vec<PeerRecord>, filter: &PeerFilter) -> Vec<Peer> {
    records
        .into_iter()
        .filter(|record| match &filter.status {
            Some(status) => record.status.as_deref() == Some(status.as_str()),
            None => true,
        })
        .filter(|record| match filter.endpoint {
            Some(kind) => record.endpoints.iter().any(|e| e == kind.as_str()),
            None => true,
        })
        // `filter.number` / `filter.hash` intentionally unapplied; see
        // `NetworkRemote::find_peers`.
        .map(|record| Peer::with_protocol(record.host, record.port, record.protocol))
        .collect()
}

#[async_trait]
impl NetworkRemote for HttpRemote {
    async fn find_peers(&self, peer: &Peer, filter: &PeerFilter) -> Result<Vec<Peer>, RemoteError> {
        let url = format!("{}/network/peers", peer.url());
        let bytes = self.get_bytes(&url).await?;
        let envelope: PeersEnvelope = serde_json::from_slice(&bytes)?;
        Ok(apply_filter(envelope.peers, filter))
    }
}
