use ethers_core::types::Address;
use serde::Serialize;

use crate::{
    chains::resolve_destination,
    config::RelayConfig,
    keys::{EphemeralKey, GatewayKey},
    payload::RelayPayload,
    relay::{callback_selector, Handle, RelayError, SealedRelay},
    seal::{SealedEnvelope, NONCE_LEN},
};

/// Builder for a [`SealedRelay`]
#[derive(Debug, Clone, Default)]
pub struct RelayMessageBuilder {
    /// Chain the message is sent on. Required
    pub chain_id: Option<u64>,
    /// Submitting wallet. Required
    pub sender: Option<Address>,
    /// Target entry point. Required
    pub handle: Option<Handle>,
    /// Application message as a JSON string. Required
    pub data: Option<String>,
    /// Routing fields. Defaults to [`RelayConfig::default`]
    pub config: Option<RelayConfig>,
    /// Ephemeral key. Defaults to a fresh random key
    pub ephemeral: Option<EphemeralKey>,
    /// Seal nonce. Defaults to a fresh random nonce
    pub nonce: Option<[u8; NONCE_LEN]>,
}

impl RelayMessageBuilder {
    /// Set `chain_id`. Required
    pub fn chain_id(mut self, val: u64) -> Self {
        self.chain_id = Some(val);
        self
    }

    /// Set `sender`. Required
    pub fn sender(mut self, val: Address) -> Self {
        self.sender = Some(val);
        self
    }

    /// Set `handle`. Required
    pub fn handle(mut self, val: Handle) -> Self {
        self.handle = Some(val);
        self
    }

    /// Set `data` to the JSON string of `message`. Required
    pub fn message<T: Serialize + ?Sized>(mut self, message: &T) -> Result<Self, RelayError> {
        self.data = Some(serde_json::to_string(message)?);
        Ok(self)
    }

    /// Set the routing fields from a config
    pub fn config(mut self, val: RelayConfig) -> Self {
        self.config = Some(val);
        self
    }

    /// Use a known ephemeral key instead of a random one
    pub fn ephemeral(mut self, val: EphemeralKey) -> Self {
        self.ephemeral = Some(val);
        self
    }

    /// Use a known nonce instead of a random one. Never reuse a nonce with
    /// the same ephemeral key.
    pub fn nonce(mut self, val: [u8; NONCE_LEN]) -> Self {
        self.nonce = Some(val);
        self
    }

    /// Encrypt the payload to `gateway` and return the message awaiting its
    /// signature
    pub fn seal(self, gateway: &GatewayKey) -> Result<SealedRelay, RelayError> {
        let mut missing = vec![];
        if self.chain_id.is_none() {
            missing.push("chain_id");
        }
        if self.sender.is_none() {
            missing.push("sender");
        }
        if self.handle.is_none() {
            missing.push("handle");
        }
        if self.data.is_none() {
            missing.push("data");
        }

        let (Some(chain_id), Some(sender), Some(handle), Some(data)) =
            (self.chain_id, self.sender, self.handle, self.data)
        else {
            return Err(RelayError::Incomplete(missing.join(", ")));
        };

        let destination =
            resolve_destination(chain_id).ok_or(RelayError::UnsupportedChain(chain_id))?;
        let config = self.config.unwrap_or_default();
        let ephemeral = self.ephemeral.unwrap_or_else(EphemeralKey::random);
        let secret = ephemeral.shared_secret(gateway)?;
        let user_key = ephemeral.public_key_bytes();

        let payload = RelayPayload {
            data,
            routing_info: config.routing_contract.clone(),
            routing_code_hash: config.routing_code_hash.clone(),
            user_address: sender,
            user_key: user_key.to_vec(),
            callback_address: destination.as_bytes().to_vec(),
            callback_selector: callback_selector().to_vec(),
            callback_gas_limit: config.callback_gas_limit,
        };

        let envelope = match self.nonce {
            Some(nonce) => {
                SealedEnvelope::seal_with_nonce(&secret, nonce, &serde_json::to_vec(&payload)?)?
            }
            None => SealedEnvelope::seal(&secret, &payload)?,
        };

        tracing::debug!(
            chain_id,
            %handle,
            ciphertext_len = envelope.ciphertext().len(),
            "Sealed relay payload"
        );

        Ok(SealedRelay {
            chain_id,
            destination,
            sender,
            handle,
            user_key,
            envelope,
            routing_info: config.routing_contract,
            routing_code_hash: config.routing_code_hash,
            task_destination_network: config.task_destination_network,
            callback_gas_limit: config.callback_gas_limit,
        })
    }
}
