use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use ethers_core::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, Signature, TransactionReceipt,
    TransactionRequest, H256, U256, U64,
};
use reqwest::{IntoUrl, Url};
use serde::de::DeserializeOwned;

use crate::{
    chain_watch::{ChainListener, ChainListeners, ListenerId},
    rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResponseError},
};

/// Wallet error
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The user declined the request
    #[error("User rejected the request: {0}")]
    Rejected(String),
    /// The wallet or node returned an error
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },
    /// reqwest
    #[error("{0}")]
    ReqwestError(#[from] reqwest::Error),
    /// Unexpected response body
    #[error("{0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Response had neither or both of `result` and `error`
    #[error("Malformed JSON-RPC response: {0}")]
    MalformedResponse(&'static str),
    /// No account connected
    #[error("Wallet returned no accounts")]
    NoAccounts,
    /// Signing requested for an account the wallet does not hold
    #[error("Account {0:?} is not managed by this wallet")]
    UnknownAccount(Address),
    /// Signer errored
    #[error("{0}")]
    Signer(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl WalletError {
    /// Whether the user declined the request
    pub fn is_rejection(&self) -> bool {
        matches!(self, WalletError::Rejected(_))
    }
}

impl From<JsonRpcError> for WalletError {
    fn from(e: JsonRpcError) -> Self {
        if e.is_user_rejection() {
            WalletError::Rejected(e.message)
        } else {
            WalletError::Rpc {
                code: e.code,
                message: e.message,
            }
        }
    }
}

impl From<ResponseError> for WalletError {
    fn from(e: ResponseError) -> Self {
        match e {
            ResponseError::Rpc(e) => e.into(),
            ResponseError::Malformed(reason) => WalletError::MalformedResponse(reason),
            ResponseError::Decode(e) => WalletError::SerdeJson(e),
        }
    }
}

/// A connected wallet: the account holder who signs and pays for relay
/// transactions, and the source of network-change events.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Connected accounts (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Current network (`eth_chainId`)
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// EIP-191 signature over `message` by `account` (`personal_sign`)
    async fn personal_sign(&self, account: Address, message: &[u8])
        -> Result<Signature, WalletError>;

    /// Current gas price (`eth_gasPrice`)
    async fn gas_price(&self) -> Result<U256, WalletError>;

    /// Submit a transaction (`eth_sendTransaction`), returning its hash
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError>;

    /// Receipt of a mined transaction, `None` while pending
    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, WalletError>;

    /// Subscribe to `chainChanged` events
    fn on_chain_changed(&self, listener: ChainListener) -> ListenerId;

    /// Unsubscribe a `chainChanged` listener
    fn remove_listener(&self, id: ListenerId);

    /// The first connected account
    async fn default_account(&self) -> Result<Address, WalletError> {
        self.request_accounts()
            .await?
            .first()
            .copied()
            .ok_or(WalletError::NoAccounts)
    }
}

/// A wallet reached over EIP-1193-style JSON-RPC on HTTP. HTTP has no push
/// channel, so network changes are detected by [`HttpWallet::poll_chain_changed`].
#[derive(Debug)]
pub struct HttpWallet {
    url: Url,
    client: reqwest::Client,
    next_id: AtomicU64,
    last_chain: AtomicU64,
    listeners: ChainListeners,
}

impl HttpWallet {
    /// Instantiate a new wallet client with a specific URL
    ///
    /// # Errors
    ///
    /// If the url param cannot be parsed as a URL
    pub fn new<S>(url: S) -> Result<Self, reqwest::Error>
    where
        S: IntoUrl,
    {
        Ok(Self::with_parts(url.into_url()?, Default::default()))
    }

    /// Instantiate a new wallet client with a specific URL and a reqwest Client
    ///
    /// # Errors
    ///
    /// If the url param cannot be parsed as a URL
    pub fn new_with_client<S>(
        url: S,
        client: reqwest::Client,
    ) -> Result<Self, <reqwest::Url as FromStr>::Err>
    where
        S: AsRef<str>,
    {
        Ok(Self::with_parts(url.as_ref().parse()?, client))
    }

    fn with_parts(url: Url, client: reqwest::Client) -> Self {
        Self {
            url,
            client,
            next_id: AtomicU64::new(1),
            last_chain: AtomicU64::new(0),
            listeners: Default::default(),
        }
    }

    /// Make a JSON-RPC call
    pub async fn request<T>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, WalletError>
    where
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let response = json_post!(
            self.client,
            self.url.clone(),
            &request,
            JsonRpcResponse,
            WalletError,
        )?;
        Ok(response.into_result()?)
    }

    /// Re-read the chain id and notify listeners if it changed since the
    /// previous poll. Returns the new chain id on change.
    pub async fn poll_chain_changed(&self) -> Result<Option<u64>, WalletError> {
        let chain_id = self.chain_id().await?;
        let previous = self.last_chain.swap(chain_id, Ordering::SeqCst);
        if previous == 0 || previous == chain_id {
            return Ok(None);
        }
        self.listeners.emit(&format!("{:#x}", chain_id));
        Ok(Some(chain_id))
    }
}

#[async_trait]
impl WalletProvider for HttpWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.request("eth_requestAccounts", serde_json::json!([])).await
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let chain_id: U64 = self.request("eth_chainId", serde_json::json!([])).await?;
        Ok(chain_id.as_u64())
    }

    async fn personal_sign(
        &self,
        account: Address,
        message: &[u8],
    ) -> Result<Signature, WalletError> {
        let params = serde_json::to_value((Bytes::from(message.to_vec()), account))?;
        let signature: String = self.request("personal_sign", params).await?;
        signature
            .parse()
            .map_err(|e| WalletError::Signer(Box::new(e)))
    }

    async fn gas_price(&self) -> Result<U256, WalletError> {
        self.request("eth_gasPrice", serde_json::json!([])).await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError> {
        let params = serde_json::to_value((tx,))?;
        self.request("eth_sendTransaction", params).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        let params = serde_json::to_value((tx_hash,))?;
        self.request("eth_getTransactionReceipt", params).await
    }

    fn on_chain_changed(&self, listener: ChainListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// A wallet that signs locally with an ethers [`ethers_signers::Signer`] and
/// uses a JSON-RPC node for chain state and broadcasting. Transactions are
/// signed here and submitted with `eth_sendRawTransaction`.
#[derive(Debug)]
pub struct SignerWallet<S> {
    signer: S,
    rpc: HttpWallet,
}

impl<S> SignerWallet<S>
where
    S: ethers_signers::Signer,
{
    /// Instantiate a signer wallet
    pub fn new(signer: S, rpc: HttpWallet) -> Self {
        Self { signer, rpc }
    }

    /// The local signer
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// The node connection
    pub fn rpc(&self) -> &HttpWallet {
        &self.rpc
    }
}

#[async_trait]
impl<S> WalletProvider for SignerWallet<S>
where
    S: ethers_signers::Signer + 'static,
    S::Error: 'static,
{
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.signer.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.rpc.chain_id().await
    }

    async fn personal_sign(
        &self,
        account: Address,
        message: &[u8],
    ) -> Result<Signature, WalletError> {
        if account != self.signer.address() {
            return Err(WalletError::UnknownAccount(account));
        }
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Signer(Box::new(e)))
    }

    async fn gas_price(&self) -> Result<U256, WalletError> {
        self.rpc.gas_price().await
    }

    #[tracing::instrument(skip(self, tx), fields(from = ?self.signer.address()))]
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError> {
        let from = self.signer.address();
        let chain_id = self.rpc.chain_id().await?;
        let nonce: U256 = self
            .rpc
            .request(
                "eth_getTransactionCount",
                serde_json::to_value((from, "pending"))?,
            )
            .await?;

        let mut tx = tx.from(from).nonce(nonce).chain_id(chain_id);
        if tx.gas_price.is_none() {
            tx = tx.gas_price(self.rpc.gas_price().await?);
        }

        let tx: TypedTransaction = tx.into();
        let signature = self
            .signer
            .sign_transaction(&tx)
            .await
            .map_err(|e| WalletError::Signer(Box::new(e)))?;
        let raw = tx.rlp_signed(&signature);
        tracing::debug!(%nonce, chain_id, "Broadcasting locally signed transaction");

        self.rpc
            .request("eth_sendRawTransaction", serde_json::to_value((raw,))?)
            .await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        self.rpc.transaction_receipt(tx_hash).await
    }

    fn on_chain_changed(&self, listener: ChainListener) -> ListenerId {
        self.rpc.on_chain_changed(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.rpc.remove_listener(id)
    }
}
