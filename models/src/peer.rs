use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Wire protocol used to reach a peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// A remote node address.
///
/// Two peers are the same node when host and port match, whatever
/// protocol either side advertises.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

impl Peer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: Protocol::Http,
        }
    }

    pub fn with_protocol(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Endpoint capabilities a peer can advertise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    /// Plain JSON block API.
    BlockApi,
    /// TLS variant of the block API.
    BlockApiTls,
    /// Push subscription endpoint.
    SubscriptionApi,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::BlockApi => "BLOCK_API",
            EndpointKind::BlockApiTls => "BLOCK_API_TLS",
            EndpointKind::SubscriptionApi => "SUBSCRIPTION_API",
        }
    }
}

/// Criteria for selecting alternate peers.
///
/// Only `status` and `endpoint` are applied by implementations today.
/// `number` and `hash` describe a head the candidate should agree with;
/// they are carried so callers can express the intent, but filtering on
/// them is not enabled yet: peer head advertisements are not refreshed
/// reliably enough to exclude peers on. See `NetworkRemote::find_peers`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeerFilter {
    pub status: Option<String>,
    pub endpoint: Option<EndpointKind>,
    pub number: Option<u64>,
    pub hash: Option<String>,
}

impl PeerFilter {
    pub fn endpoint(kind: EndpointKind) -> Self {
        Self {
            endpoint: Some(kind),
            ..Self::default()
        }
    }
}
