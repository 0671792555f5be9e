use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chain-level parameters published by a peer.
///
/// The mirror only needs the currency name; the rest of the parameter
/// document is kept opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParameters {
    pub currency: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
