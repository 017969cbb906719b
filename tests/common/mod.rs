#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use ethers_core::{
    types::{
        Address, Log, Signature, TransactionReceipt, TransactionRequest, H256, U256, U64,
    },
    utils::keccak256,
};
use ethers_signers::{LocalWallet, Signer};
use qv_relay::{
    query::{ComputeError, NOT_FOUND_SENTINEL},
    rpc::{ContractQuery, QueryMsg},
    ChainListener, ChainListeners, ComputeQuery, ListenerId, WalletError, WalletProvider,
};

/// In-memory wallet signing with a fixed key
pub struct MockWallet {
    pub signer: LocalWallet,
    pub chain_id: AtomicU64,
    pub gas_price: U256,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub listeners: ChainListeners,
    /// receipt polls answered with "still pending"
    pub pending_polls: AtomicUsize,
    /// status of the receipt once mined
    pub receipt_status: u64,
    pub reject_sends: bool,
    /// node error returned for receipt lookups
    pub receipt_error: Option<i64>,
    pub receipt_logs: Vec<Log>,
}

impl MockWallet {
    pub fn new(chain_id: u64) -> Self {
        Self {
            signer: "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
                .parse()
                .unwrap(),
            chain_id: AtomicU64::new(chain_id),
            gas_price: U256::from(1_000_000_000u64),
            sent: Default::default(),
            listeners: Default::default(),
            pending_polls: AtomicUsize::new(0),
            receipt_status: 1,
            reject_sends: false,
            receipt_error: None,
            receipt_logs: vec![],
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Switch network and emit `chainChanged` the way a browser wallet does
    pub fn switch_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        self.listeners.emit(&format!("{:#x}", chain_id));
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.signer.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn personal_sign(
        &self,
        account: Address,
        message: &[u8],
    ) -> Result<Signature, WalletError> {
        assert_eq!(account, self.signer.address());
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Signer(Box::new(e)))
    }

    async fn gas_price(&self) -> Result<U256, WalletError> {
        Ok(self.gas_price)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError> {
        if self.reject_sends {
            return Err(WalletError::Rejected("User denied transaction signature.".to_owned()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(keccak256(sent.len().to_be_bytes()).into())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        if let Some(code) = self.receipt_error {
            return Err(WalletError::Rpc {
                code,
                message: String::new(),
            });
        }
        let still_pending = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if still_pending {
            return Ok(None);
        }
        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(self.receipt_status)),
            logs: self.receipt_logs.clone(),
            ..Default::default()
        }))
    }

    fn on_chain_changed(&self, listener: ChainListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// Voting contract stand-in holding proposals at keys `1..=proposals`
pub struct MockCompute {
    pub proposals: u32,
    /// keys whose queries fail at the transport level
    pub failing_votes: Vec<u32>,
    pub failing_proposal: Option<u32>,
    pub queried: Mutex<Vec<QueryMsg>>,
}

impl MockCompute {
    pub fn with_proposals(proposals: u32) -> Self {
        Self {
            proposals,
            failing_votes: vec![],
            failing_proposal: None,
            queried: Default::default(),
        }
    }

    pub fn queried(&self) -> Vec<QueryMsg> {
        self.queried.lock().unwrap().clone()
    }
}

fn transport_error() -> ComputeError {
    serde_json::from_str::<serde_json::Value>("<html>502 Bad Gateway</html>")
        .unwrap_err()
        .into()
}

#[async_trait]
impl ComputeQuery for MockCompute {
    async fn query_contract(
        &self,
        query: &ContractQuery,
    ) -> Result<serde_json::Value, ComputeError> {
        self.queried.lock().unwrap().push(query.query);
        match query.query {
            QueryMsg::RetrieveProposal { key } if Some(key) == self.failing_proposal => {
                Err(transport_error())
            }
            QueryMsg::RetrieveProposal { key } if key <= self.proposals => Ok(serde_json::json!({
                "message": "Retrieved value successfully",
                "end_time": 1000 + key,
                "name": format!("Project {}", key),
                "description": "desc",
            })),
            QueryMsg::RetrieveVotes { key } if self.failing_votes.contains(&key) => {
                Err(transport_error())
            }
            QueryMsg::RetrieveVotes { key } if key <= self.proposals => Ok(serde_json::json!({
                "message": "Votes retrieved",
                "vote_count": 1,
                "vote_details": [format!("0xabc: {}", key)],
                "total_votes": key,
            })),
            _ => Ok(serde_json::Value::String(NOT_FOUND_SENTINEL.to_owned())),
        }
    }
}
