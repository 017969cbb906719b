use ethers_core::types::{TransactionRequest, H256, U256};

use crate::{
    chains::Chain,
    relay::SignedRelay,
    wallet::{WalletError, WalletProvider},
};

/// Fee multiplier on chains whose gas price is far below the price the
/// relay charges for the callback
pub const HIGH_FEE_MULTIPLIER: u64 = 100_000;
/// Fee multiplier everywhere else
pub const DEFAULT_FEE_MULTIPLIER: u64 = 3;
/// Divisor applied after the multiplier
pub const FEE_DIVISOR: u64 = 2;

/// Submission error
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The user declined the transaction
    #[error("Transaction rejected by the user: {0}")]
    Rejected(String),
    /// Gas price could not be read
    #[error("Could not read the gas price: {0}")]
    GasPrice(#[source] WalletError),
    /// The wallet failed to send
    #[error("Could not send the transaction: {0}")]
    Send(#[source] WalletError),
}

impl SubmitError {
    fn from_send(e: WalletError) -> Self {
        match e {
            WalletError::Rejected(message) => SubmitError::Rejected(message),
            e => SubmitError::Send(e),
        }
    }
}

/// Multiplier for the callback fee on `chain_id`
pub fn fee_multiplier(chain_id: u64) -> u64 {
    match Chain::from_id(chain_id) {
        Some(Chain::LiskSepolia) => HIGH_FEE_MULTIPLIER,
        _ => DEFAULT_FEE_MULTIPLIER,
    }
}

/// Value sent with the relay transaction to pay for the callback:
/// `gas_price * callback_gas_limit * multiplier / 2`
pub fn relay_fee(gas_price: U256, callback_gas_limit: u32, chain_id: u64) -> U256 {
    gas_price
        .saturating_mul(U256::from(callback_gas_limit))
        .saturating_mul(U256::from(fee_multiplier(chain_id)))
        / U256::from(FEE_DIVISOR)
}

/// The `send` transaction: from the sender to the relay contract, paying
/// `fee`
pub fn transaction_request(relay: &SignedRelay, fee: U256, gas: u64) -> TransactionRequest {
    TransactionRequest::new()
        .from(relay.call.user_address)
        .to(relay.destination)
        .gas(gas)
        .value(fee)
        .data(relay.calldata())
}

/// Price the callback at the current gas price and send the relay
/// transaction through the wallet. Returns the transaction hash.
#[tracing::instrument(
    skip(wallet, relay),
    fields(chain_id = relay.chain_id, payload_hash = ?relay.payload_hash())
)]
pub async fn submit<W>(wallet: &W, relay: &SignedRelay, gas: u64) -> Result<H256, SubmitError>
where
    W: WalletProvider + ?Sized,
{
    let gas_price = wallet.gas_price().await.map_err(SubmitError::GasPrice)?;
    let fee = relay_fee(gas_price, relay.info().callback_gas_limit, relay.chain_id);
    tracing::debug!(%gas_price, %fee, "Priced relay callback");

    let tx = transaction_request(relay, fee, gas);
    match wallet.send_transaction(tx).await {
        Ok(tx_hash) => {
            tracing::info!(?tx_hash, "Relay transaction sent");
            Ok(tx_hash)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Relay transaction failed");
            Err(SubmitError::from_send(e))
        }
    }
}
