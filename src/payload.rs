use std::collections::BTreeMap;

use ethers_core::types::Address;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::cart::VoteCart;

/// Proposal lifetime sent with new projects, in minutes (30 days)
pub const DEFAULT_PROPOSAL_MINUTES: u64 = 43_200;

/// The plaintext sealed to the gateway. The gateway decrypts it, checks the
/// routing fields and hands `data` to the handle named in the relay info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayPayload {
    /// Application message, as a JSON string
    pub data: String,
    /// Destination contract on the compute chain
    pub routing_info: String,
    /// Code hash of the destination contract
    pub routing_code_hash: String,
    /// Submitting wallet
    pub user_address: Address,
    /// Compressed ephemeral public key (not the wallet key)
    #[serde(with = "crate::ser::base64_bytes")]
    pub user_key: Vec<u8>,
    /// Contract receiving the result callback
    #[serde(with = "crate::ser::base64_bytes")]
    pub callback_address: Vec<u8>,
    /// Selector of the callback entry point
    #[serde(with = "crate::ser::base64_bytes")]
    pub callback_selector: Vec<u8>,
    /// Gas granted to the callback
    pub callback_gas_limit: u32,
}

/// New project application, stored as a proposal by the voting contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalInput {
    /// Project name
    pub name: String,
    /// Project description
    pub description: String,
    /// Voting window in minutes, as a decimal string
    pub end_time: String,
}

impl ProposalInput {
    /// A proposal open for the default 30 days
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            end_time: DEFAULT_PROPOSAL_MINUTES.to_string(),
        }
    }

    /// Override the voting window
    #[must_use]
    pub fn open_for_minutes(mut self, minutes: u64) -> Self {
        self.end_time = minutes.to_string();
        self
    }
}

/// A ballot: vote weight per project id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteInput {
    /// Weight per project id. Serialized in JavaScript property order, so
    /// numeric ids ascend numerically (`"2"` before `"10"`) and any other
    /// ids follow in lexicographic order.
    #[serde(serialize_with = "js_property_order")]
    pub votes: BTreeMap<String, u32>,
    /// Voting wallet
    pub wallet_address: Address,
}

impl VoteInput {
    /// Build a ballot from the cart contents
    pub fn from_cart(cart: &VoteCart, wallet_address: Address) -> Self {
        Self {
            votes: cart.votes(),
            wallet_address,
        }
    }
}

/// Canonical array index: decimal without leading zeros, below 2^32 - 1
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

fn property_key(key: &str) -> (bool, u32, &str) {
    match array_index(key) {
        Some(index) => (false, index, ""),
        None => (true, 0, key),
    }
}

fn js_property_order<S>(votes: &BTreeMap<String, u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut entries: Vec<_> = votes.iter().collect();
    entries.sort_by(|a, b| property_key(a.0).cmp(&property_key(b.0)));

    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (id, amount) in entries {
        map.serialize_entry(id, amount)?;
    }
    map.end()
}
