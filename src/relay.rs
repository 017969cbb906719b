use ethers_core::{
    abi::{self, Token},
    types::{Address, Bytes, Signature, H256, U256},
    utils::{hash_message, id, keccak256},
};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{
    keys::KeyError,
    seal::{SealError, SealedEnvelope, NONCE_LEN},
    ser::RsvSignature,
    submit::SubmitError,
    task::ConfirmationError,
    wallet::{WalletError, WalletProvider},
};

/// Solidity signature of the relay contract's entry point
pub const SEND_SIGNATURE: &str =
    "send(bytes32,address,string,(bytes,bytes,string,string,string,bytes12,uint32,bytes,bytes))";

/// Solidity signature of the entry point that receives the result callback
pub const CALLBACK_SIGNATURE: &str = "upgradeHandler()";

/// Length of an uncompressed SEC1 public key
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Selector of [`SEND_SIGNATURE`]
pub fn send_selector() -> [u8; 4] {
    id(SEND_SIGNATURE)
}

/// Selector of [`CALLBACK_SIGNATURE`]
pub fn callback_selector() -> [u8; 4] {
    id(CALLBACK_SIGNATURE)
}

/// Relay error
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No destination contract on this chain
    #[error("No relay destination for chain {0}")]
    UnsupportedChain(u64),
    /// Builder lacks required values
    #[error("Missing required values in build: {0}")]
    Incomplete(String),
    /// Wallet errored
    #[error(transparent)]
    Wallet(#[from] WalletError),
    /// Key agreement errored
    #[error(transparent)]
    Key(#[from] KeyError),
    /// Sealing errored
    #[error(transparent)]
    Seal(#[from] SealError),
    /// Application message could not be serialized
    #[error("Application message could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),
    /// The wallet signed with another account
    #[error("Signature recovers to {actual:?}, expected {expected:?}")]
    WrongSigner {
        /// Sender named in the message
        expected: Address,
        /// Account that produced the signature
        actual: Address,
    },
    /// Public key could not be recovered from the signature
    #[error("Public key recovery failed: {0}")]
    Recovery(String),
    /// The vote cart is empty
    #[error("Refusing to submit an empty ballot")]
    EmptyVotes,
    /// Submission errored
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// Confirmation errored
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

impl RelayError {
    /// Whether the user declined a wallet prompt somewhere in the flow
    pub fn is_rejection(&self) -> bool {
        match self {
            RelayError::Wallet(e) => e.is_rejection(),
            RelayError::Submit(SubmitError::Rejected(_)) => true,
            _ => false,
        }
    }
}

/// Entry point on the compute-chain contract that handles the message
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    /// Store a new project proposal
    CreateProposal,
    /// Record a ballot
    CreateVote,
}

impl Handle {
    /// Name as the contract expects it
    pub const fn as_str(self) -> &'static str {
        match self {
            Handle::CreateProposal => "create_proposal",
            Handle::CreateVote => "create_vote",
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `RelayInfo` tuple of the `send` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayInfo {
    /// Compressed ephemeral public key
    pub user_key: Bytes,
    /// Uncompressed wallet public key, recovered from the signature
    pub user_pubkey: Bytes,
    /// Code hash of the routing contract
    pub routing_code_hash: String,
    /// Compute chain id
    pub task_destination_network: String,
    /// Entry point on the routing contract
    pub handle: Handle,
    /// Seal nonce
    pub nonce: [u8; NONCE_LEN],
    /// Gas granted to the callback
    pub callback_gas_limit: u32,
    /// Ciphertext with the tag appended
    pub payload: Bytes,
    /// Wallet signature over the ciphertext hash
    pub payload_signature: RsvSignature,
}

impl RelayInfo {
    /// ABI tuple token, in the contract's field order
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Bytes(self.user_key.to_vec()),
            Token::Bytes(self.user_pubkey.to_vec()),
            Token::String(self.routing_code_hash.clone()),
            Token::String(self.task_destination_network.clone()),
            Token::String(self.handle.as_str().to_owned()),
            Token::FixedBytes(self.nonce.to_vec()),
            Token::Uint(U256::from(self.callback_gas_limit)),
            Token::Bytes(self.payload.to_vec()),
            Token::Bytes(self.payload_signature.to_bytes().to_vec()),
        ])
    }
}

/// Arguments of the relay contract's `send` entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendCall {
    /// Message id: the EIP-191 digest of the ciphertext hash
    pub payload_hash: H256,
    /// Submitting wallet
    pub user_address: Address,
    /// Routing contract on the compute chain
    pub routing_info: String,
    /// Relay envelope
    pub info: RelayInfo,
}

impl SendCall {
    /// ABI tokens of the call arguments
    pub fn tokens(&self) -> Vec<Token> {
        vec![
            Token::FixedBytes(self.payload_hash.as_bytes().to_vec()),
            Token::Address(self.user_address),
            Token::String(self.routing_info.clone()),
            self.info.to_token(),
        ]
    }

    /// Calldata: selector followed by the encoded arguments
    pub fn encode(&self) -> Bytes {
        let mut data = send_selector().to_vec();
        data.extend(abi::encode(&self.tokens()));
        data.into()
    }
}

/// EIP-191 digest of a ciphertext hash, the digest `personal_sign` signs
pub fn payload_hash(ciphertext_hash: H256) -> H256 {
    hash_message(ciphertext_hash)
}

fn recovery_parity(v: u64) -> Result<u8, RelayError> {
    match v {
        0 | 1 => Ok(v as u8),
        27 | 28 => Ok((v - 27) as u8),
        v if v >= 35 => Ok(((v - 35) % 2) as u8),
        v => Err(RelayError::Recovery(format!("invalid recovery byte {}", v))),
    }
}

/// Recover the uncompressed public key that produced `signature` over the
/// prehashed `digest`.
pub fn recover_public_key(
    digest: H256,
    signature: &Signature,
) -> Result<[u8; UNCOMPRESSED_KEY_LEN], RelayError> {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    signature.r.to_big_endian(&mut r);
    signature.s.to_big_endian(&mut s);

    let sig = EcdsaSignature::from_scalars(r, s)
        .map_err(|e| RelayError::Recovery(e.to_string()))?;
    let mut recovery_id = RecoveryId::from_byte(recovery_parity(signature.v)?)
        .ok_or_else(|| RelayError::Recovery("invalid recovery id".to_owned()))?;

    // k256 only accepts low-s; negating s flips the parity of R
    let sig = match sig.normalize_s() {
        Some(low) => {
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
            low
        }
        None => sig,
    };

    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|e| RelayError::Recovery(e.to_string()))?;

    let mut out = [0u8; UNCOMPRESSED_KEY_LEN];
    out.copy_from_slice(key.to_encoded_point(false).as_bytes());
    Ok(out)
}

/// Ethereum address of an uncompressed public key
pub fn public_key_to_address(public_key: &[u8; UNCOMPRESSED_KEY_LEN]) -> Address {
    Address::from_slice(&keccak256(&public_key[1..])[12..])
}

/// A sealed message waiting for the wallet's signature
#[derive(Debug, Clone)]
pub struct SealedRelay {
    pub(crate) chain_id: u64,
    pub(crate) destination: Address,
    pub(crate) sender: Address,
    pub(crate) handle: Handle,
    pub(crate) user_key: [u8; crate::keys::COMPRESSED_KEY_LEN],
    pub(crate) envelope: SealedEnvelope,
    pub(crate) routing_info: String,
    pub(crate) routing_code_hash: String,
    pub(crate) task_destination_network: String,
    pub(crate) callback_gas_limit: u32,
}

impl SealedRelay {
    /// Chain the message is sent on
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Relay contract on that chain
    pub fn destination(&self) -> Address {
        self.destination
    }

    /// Submitting wallet
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Target entry point
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The sealed payload
    pub fn envelope(&self) -> &SealedEnvelope {
        &self.envelope
    }

    /// keccak256 of ciphertext and tag. This is what the wallet signs.
    pub fn ciphertext_hash(&self) -> H256 {
        self.envelope.ciphertext_hash()
    }

    /// The message id
    pub fn payload_hash(&self) -> H256 {
        payload_hash(self.ciphertext_hash())
    }

    /// Ask the wallet to `personal_sign` the ciphertext hash as the sender,
    /// then assemble the call.
    pub async fn sign<W>(self, wallet: &W) -> Result<SignedRelay, RelayError>
    where
        W: WalletProvider + ?Sized,
    {
        let signature = wallet
            .personal_sign(self.sender, self.ciphertext_hash().as_bytes())
            .await?;
        self.sign_with(signature)
    }

    /// Assemble the call from a signature obtained elsewhere. The signature
    /// must recover to the sender.
    pub fn sign_with(self, signature: Signature) -> Result<SignedRelay, RelayError> {
        let payload_hash = self.payload_hash();
        let user_pubkey = recover_public_key(payload_hash, &signature)?;

        let actual = public_key_to_address(&user_pubkey);
        if actual != self.sender {
            return Err(RelayError::WrongSigner {
                expected: self.sender,
                actual,
            });
        }

        let info = RelayInfo {
            user_key: self.user_key.to_vec().into(),
            user_pubkey: user_pubkey.to_vec().into(),
            routing_code_hash: self.routing_code_hash,
            task_destination_network: self.task_destination_network,
            handle: self.handle,
            nonce: *self.envelope.nonce(),
            callback_gas_limit: self.callback_gas_limit,
            payload: self.envelope.ciphertext().to_vec().into(),
            payload_signature: signature.into(),
        };

        Ok(SignedRelay {
            chain_id: self.chain_id,
            destination: self.destination,
            call: SendCall {
                payload_hash,
                user_address: self.sender,
                routing_info: self.routing_info,
                info,
            },
        })
    }
}

/// A signed `send` call bound to its chain and relay contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRelay {
    /// Chain the call is sent on
    pub chain_id: u64,
    /// Relay contract on that chain
    pub destination: Address,
    /// Call arguments
    pub call: SendCall,
}

impl SignedRelay {
    /// Calldata for the transaction
    pub fn calldata(&self) -> Bytes {
        self.call.encode()
    }

    /// The message id
    pub fn payload_hash(&self) -> H256 {
        self.call.payload_hash
    }

    /// The embedded relay envelope
    pub fn info(&self) -> &RelayInfo {
        &self.call.info
    }
}
