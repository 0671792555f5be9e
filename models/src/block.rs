use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A confirmed ledger block as carried on the wire.
///
/// Only the fields the mirror inspects are typed. Everything else a peer
/// sends (transactions, issuer documents, certifications...) rides along
/// in `extra` and is written back out unchanged.
///
/// Within one currency, `number` is unique. A block indexed under a given
/// number is immutable once its hash matches the stored one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub currency: String,
    pub number: u64,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monetary_mass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_changes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Extract the block number from a raw payload without decoding the
    /// rest of it.
    pub fn peek_number(payload: &[u8]) -> Result<u64, serde_json::Error> {
        #[derive(Deserialize)]
        struct NumberOnly {
            number: u64,
        }

        serde_json::from_slice::<NumberOnly>(payload).map(|n| n.number)
    }
}
