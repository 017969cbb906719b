//! Encrypted cross-chain relay client for quadratic voting.
//!
//! Application messages (project proposals and ballots) are sealed to a
//! relay gateway with an ephemeral ECDH key and ChaCha20-Poly1305, signed by
//! the user's wallet, and submitted to the relay contract on the connected
//! EVM chain, which forwards them to a voting contract on a confidential
//! compute chain. Stored proposals and tallies are read back through a
//! compute-query endpoint.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

/// Supported chains and their relay contracts
pub mod chains;
pub use chains::{parse_chain_id, resolve_destination, Chain};

/// Ephemeral key agreement with the gateway
pub mod keys;
pub use keys::{EphemeralKey, GatewayKey, KeyError, SharedSecret};

/// Authenticated encryption of relay payloads
pub mod seal;
pub use seal::{SealError, SealedEnvelope};

/// Relay payload and application messages
pub mod payload;
pub use payload::{ProposalInput, RelayPayload, VoteInput};

/// Relay message assembly and signing
pub mod relay;
pub use relay::{Handle, RelayError, RelayInfo, SealedRelay, SendCall, SignedRelay};

/// Builders
pub mod builders;
pub use builders::RelayMessageBuilder;

/// Relay transaction submission
pub mod submit;
pub use submit::SubmitError;

/// Pending transaction confirmation
pub mod task;
pub use task::{decode_logs, ConfirmationError, PendingTransaction};

/// Wallet provider boundary
pub mod wallet;
pub use wallet::{HttpWallet, SignerWallet, WalletError, WalletProvider};

/// Network change observation
pub mod chain_watch;
pub use chain_watch::{ChainListener, ChainListeners, ChainWatch, ListenerId};

/// Proposal and vote queries
pub mod query;
pub use query::{ComputeQuery, HttpComputeQuery, ProposalQueryClient, QueryOutcome};

/// RPC request and response types
pub mod rpc;

/// Quadratic voting cart
pub mod cart;
pub use cart::{CartError, CartItem, VoteCart};

/// Deployment configuration
pub mod config;
pub use config::{ConfigError, RelayConfig};

/// End-to-end voting client
pub mod client;
pub use client::VotingClient;

/// serde helpers
pub mod ser;

/// Re-export reqwest for convenience
pub use reqwest;
