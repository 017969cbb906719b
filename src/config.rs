use serde::{Deserialize, Serialize};
use url::Url;

use crate::keys::{GatewayKey, KeyError};

/// Voting contract on the compute chain. Relayed messages are routed to it
/// and proposals are queried from it.
pub const ROUTING_CONTRACT: &str = "secret1wcld9uhn3ngeqdd86jdqvrhjhs2xvk9ukdpuea";
/// Code hash of [`ROUTING_CONTRACT`]
pub const ROUTING_CODE_HASH: &str =
    "d972d38e55d427d2b4c9d12d6f93ff50fcca0172cedd886ff6ff821d08857297";
/// Base64 SEC1 public key of the relay gateway
pub const GATEWAY_PUBLIC_KEY: &str = "A20KrD7xDmkFXpNMqJn1CLpRaDLcdKpO1NdBBS7VpWh3";
/// Compute chain the relay forwards to
pub const TASK_DESTINATION_NETWORK: &str = "pulsar-3";
/// Gas granted to the result callback
pub const CALLBACK_GAS_LIMIT: u32 = 300_000;
/// Gas limit of the `send` transaction itself
pub const TX_GAS_LIMIT: u64 = 150_000;

/// Config error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config JSON could not be parsed
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Gateway key unusable
    #[error("Invalid gateway key: {0}")]
    GatewayKey(#[from] KeyError),
    /// Code hash is not 32 hex bytes
    #[error("Routing code hash must be 32 hex-encoded bytes, got {0:?}")]
    CodeHash(String),
    /// Empty required field
    #[error("Missing value for {0}")]
    Missing(&'static str),
    /// Zero gas limit
    #[error("Gas limit {0} must be non-zero")]
    ZeroGas(&'static str),
}

/// Deployment parameters for the relay flow and the query client. The
/// default is the live testnet deployment; the per-chain destination table
/// is fixed and not part of the config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Voting contract address on the compute chain
    pub routing_contract: String,
    /// Voting contract code hash
    pub routing_code_hash: String,
    /// Base64 gateway public key
    pub gateway_public_key: String,
    /// Compute chain id
    pub task_destination_network: String,
    /// Gas granted to the result callback
    pub callback_gas_limit: u32,
    /// Gas limit for the `send` transaction
    pub tx_gas_limit: u64,
    /// Query proxy for the voting contract. It accepts a `ContractQuery`
    /// JSON body by POST, runs the encrypted smart query on the compute
    /// chain, and answers with the contract's decrypted JSON. A bare LCD
    /// endpoint does not serve this, so there is no default.
    pub query_url: Option<Url>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            routing_contract: ROUTING_CONTRACT.to_owned(),
            routing_code_hash: ROUTING_CODE_HASH.to_owned(),
            gateway_public_key: GATEWAY_PUBLIC_KEY.to_owned(),
            task_destination_network: TASK_DESTINATION_NETWORK.to_owned(),
            callback_gas_limit: CALLBACK_GAS_LIMIT,
            tx_gas_limit: TX_GAS_LIMIT,
            query_url: None,
        }
    }
}

impl RelayConfig {
    /// Parse a (possibly partial) JSON config. Missing fields take their
    /// defaults. The result is validated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The query proxy endpoint
    pub fn query_url(&self) -> Result<&Url, ConfigError> {
        self.query_url.as_ref().ok_or(ConfigError::Missing("query_url"))
    }

    /// Parse the configured gateway key
    pub fn gateway_key(&self) -> Result<GatewayKey, KeyError> {
        GatewayKey::from_base64(&self.gateway_public_key)
    }

    /// Check the config is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing_contract.is_empty() {
            return Err(ConfigError::Missing("routing_contract"));
        }
        if self.task_destination_network.is_empty() {
            return Err(ConfigError::Missing("task_destination_network"));
        }
        match hex::decode(&self.routing_code_hash) {
            Ok(bytes) if bytes.len() == 32 => {}
            _ => return Err(ConfigError::CodeHash(self.routing_code_hash.clone())),
        }
        if self.callback_gas_limit == 0 {
            return Err(ConfigError::ZeroGas("callback_gas_limit"));
        }
        if self.tx_gas_limit == 0 {
            return Err(ConfigError::ZeroGas("tx_gas_limit"));
        }
        self.gateway_key()?;
        Ok(())
    }
}
