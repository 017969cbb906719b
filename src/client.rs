use std::time::Duration;

use ethers_core::{
    abi::Event,
    types::{Address, TransactionReceipt, H256},
};
use serde::Serialize;

use crate::{
    builders::RelayMessageBuilder,
    cart::VoteCart,
    chain_watch::ChainWatch,
    config::{ConfigError, RelayConfig},
    keys::GatewayKey,
    payload::{ProposalInput, VoteInput},
    relay::{Handle, RelayError, SignedRelay},
    submit::submit,
    task::{decode_logs, PendingTransaction},
    wallet::{WalletError, WalletProvider},
};

const DEFAULT_CONFIRMATION_RETRIES: usize = 40;
const DEFAULT_CONFIRMATION_INTERVAL: Duration = Duration::from_secs(3);

/// Drives the relay flow for a connected wallet: seal, sign, submit and
/// confirm project proposals and ballots.
#[derive(Debug)]
pub struct VotingClient<W> {
    wallet: W,
    config: RelayConfig,
    gateway: GatewayKey,
    confirmation_retries: usize,
    confirmation_interval: Duration,
    votes_created: Option<Event>,
}

impl<W: WalletProvider> VotingClient<W> {
    /// Instantiate a client for the default deployment
    pub fn new(wallet: W) -> Result<Self, ConfigError> {
        Self::with_config(wallet, RelayConfig::default())
    }

    /// Instantiate a client for a specific deployment
    ///
    /// # Errors
    ///
    /// If the config does not validate
    pub fn with_config(wallet: W, config: RelayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gateway = config.gateway_key()?;
        Ok(Self {
            wallet,
            config,
            gateway,
            confirmation_retries: DEFAULT_CONFIRMATION_RETRIES,
            confirmation_interval: DEFAULT_CONFIRMATION_INTERVAL,
            votes_created: None,
        })
    }

    /// Sets how long [`VotingClient::submit_votes`] waits for a receipt
    #[must_use]
    pub fn confirmation_polling<T: Into<Duration>>(mut self, retries: usize, interval: T) -> Self {
        self.confirmation_retries = retries;
        self.confirmation_interval = interval.into();
        self
    }

    /// ABI of the event the destination emits when a ballot is recorded.
    /// Matching receipt logs of confirmed ballots are logged at `info`.
    #[must_use]
    pub fn votes_created_event(mut self, event: Event) -> Self {
        self.votes_created = Some(event);
        self
    }

    /// The wallet
    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// The deployment config
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Follow the wallet's network until the returned guard is dropped
    pub async fn watch_chain(&self) -> Result<ChainWatch<'_, W>, WalletError> {
        ChainWatch::attach(&self.wallet).await
    }

    /// The wallet's first account
    pub async fn sender(&self) -> Result<Address, RelayError> {
        Ok(self.wallet.default_account().await?)
    }

    /// A message builder preset with this client's deployment
    pub fn builder(&self) -> RelayMessageBuilder {
        RelayMessageBuilder::default().config(self.config.clone())
    }

    /// Seal `message` for `handle` and have the wallet sign it
    #[tracing::instrument(skip(self, message))]
    pub async fn prepare<T>(
        &self,
        chain_id: u64,
        sender: Address,
        handle: Handle,
        message: &T,
    ) -> Result<SignedRelay, RelayError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let sealed = self
            .builder()
            .chain_id(chain_id)
            .sender(sender)
            .handle(handle)
            .message(message)?
            .seal(&self.gateway)?;
        sealed.sign(&self.wallet).await
    }

    /// Seal and sign a project proposal
    pub async fn prepare_proposal(
        &self,
        chain_id: u64,
        sender: Address,
        proposal: &ProposalInput,
    ) -> Result<SignedRelay, RelayError> {
        self.prepare(chain_id, sender, Handle::CreateProposal, proposal)
            .await
    }

    /// Seal and sign the ballot held in `cart`
    pub async fn prepare_votes(
        &self,
        chain_id: u64,
        sender: Address,
        cart: &VoteCart,
    ) -> Result<SignedRelay, RelayError> {
        if cart.is_empty() {
            return Err(RelayError::EmptyVotes);
        }
        let ballot = VoteInput::from_cart(cart, sender);
        self.prepare(chain_id, sender, Handle::CreateVote, &ballot)
            .await
    }

    /// Send a signed relay call. Returns the transaction hash.
    pub async fn submit(&self, relay: &SignedRelay) -> Result<H256, RelayError> {
        Ok(submit(&self.wallet, relay, self.config.tx_gas_limit).await?)
    }

    /// Wait for a sent transaction, using this client's polling settings
    pub fn pending(&self, tx_hash: H256) -> PendingTransaction<'_, W> {
        PendingTransaction::new(tx_hash, &self.wallet)
            .retries(self.confirmation_retries)
            .polling_interval(self.confirmation_interval)
    }

    /// Submit a project proposal from the wallet's account on `chain_id`.
    /// Returns the transaction hash.
    #[tracing::instrument(skip(self, proposal), fields(name = %proposal.name))]
    pub async fn create_proposal(
        &self,
        chain_id: u64,
        proposal: &ProposalInput,
    ) -> Result<H256, RelayError> {
        let sender = self.sender().await?;
        let relay = self.prepare_proposal(chain_id, sender, proposal).await?;
        self.submit(&relay).await
    }

    /// Submit the cart as a ballot from the wallet's account on `chain_id`
    /// and wait for the receipt. The cart is cleared only once the
    /// transaction is confirmed.
    #[tracing::instrument(
        skip(self, cart),
        fields(items = cart.items().len(), total = cart.total())
    )]
    pub async fn submit_votes(
        &self,
        chain_id: u64,
        cart: &mut VoteCart,
    ) -> Result<TransactionReceipt, RelayError> {
        let sender = self.sender().await?;
        let relay = self.prepare_votes(chain_id, sender, cart).await?;
        let tx_hash = self.submit(&relay).await?;
        let receipt = self.pending(tx_hash).await?;
        if let Some(event) = &self.votes_created {
            for log in decode_logs(&receipt, event) {
                tracing::info!(event = %event.name, params = ?log.params, "Votes created");
            }
        }
        cart.clear();
        tracing::info!(?tx_hash, "Ballot recorded, cart cleared");
        Ok(receipt)
    }
}
