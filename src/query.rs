use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{IntoUrl, Url};
use serde::de::DeserializeOwned;

use crate::{
    config::{ConfigError, RelayConfig},
    rpc::{ContractQuery, Proposal, ProposalRecord, QueryMsg, VoteTally},
};

/// Error string the voting contract returns for an empty storage key
pub const NOT_FOUND_SENTINEL: &str = "Generic error: Value not found";

/// Compute query error
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// reqwest
    #[error("{0}")]
    ReqwestError(#[from] reqwest::Error),
    /// Response was not JSON
    #[error("{0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// A backend able to run smart queries against compute-chain contracts
#[async_trait]
pub trait ComputeQuery: Send + Sync {
    /// Run `query` and return the contract's raw answer. Contract-level
    /// errors come back as JSON strings, not as `Err`.
    async fn query_contract(&self, query: &ContractQuery)
        -> Result<serde_json::Value, ComputeError>;
}

/// Compute queries POSTed as `ContractQuery` JSON to a query proxy that
/// performs the encrypted smart query and returns the contract's answer
#[derive(Debug, Clone)]
pub struct HttpComputeQuery {
    url: Url,
    client: reqwest::Client,
}

impl HttpComputeQuery {
    /// Instantiate a new query client with a specific URL
    ///
    /// # Errors
    ///
    /// If the url param cannot be parsed as a URL
    pub fn new<S>(url: S) -> Result<Self, reqwest::Error>
    where
        S: IntoUrl,
    {
        Ok(Self {
            url: url.into_url()?,
            client: Default::default(),
        })
    }

    /// Instantiate a new query client with a specific URL and a reqwest Client
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
        Ok(Self {
            url: url.as_ref().parse()?,
            client,
        })
    }

    /// Query client for the proxy named in `config`
    ///
    /// # Errors
    ///
    /// If `config` names no query endpoint
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.query_url()?.clone(),
            client: Default::default(),
        })
    }
}

#[async_trait]
impl ComputeQuery for HttpComputeQuery {
    async fn query_contract(
        &self,
        query: &ContractQuery,
    ) -> Result<serde_json::Value, ComputeError> {
        json_post!(
            self.client,
            self.url.clone(),
            query,
            serde_json::Value,
            ComputeError,
        )
    }
}

/// Result of a single contract query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome<T> {
    /// The key holds a record
    Found(T),
    /// The key is empty
    NotFound,
    /// Transport failure, contract error or malformed record
    QueryError(String),
}

impl<T> QueryOutcome<T> {
    /// The record, if found
    pub fn found(self) -> Option<T> {
        match self {
            QueryOutcome::Found(record) => Some(record),
            _ => None,
        }
    }

    /// Whether the key is empty
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryOutcome::NotFound)
    }
}

fn is_not_found(message: &str) -> bool {
    message == NOT_FOUND_SENTINEL
        || (message.starts_with("Generic error:") && message.to_lowercase().contains("not found"))
}

impl<T: DeserializeOwned> QueryOutcome<T> {
    /// Classify a raw query answer. `null` and the not-found sentinel mean
    /// an empty key; any other string is a contract error; anything else
    /// must deserialize as `T`.
    pub fn classify(response: Result<serde_json::Value, ComputeError>) -> Self {
        match response {
            Err(e) => QueryOutcome::QueryError(e.to_string()),
            Ok(serde_json::Value::Null) => QueryOutcome::NotFound,
            Ok(serde_json::Value::String(message)) if is_not_found(&message) => {
                QueryOutcome::NotFound
            }
            Ok(serde_json::Value::String(message)) => QueryOutcome::QueryError(message),
            Ok(value) => match serde_json::from_value(value) {
                Ok(record) => QueryOutcome::Found(record),
                Err(e) => QueryOutcome::QueryError(format!("malformed response: {}", e)),
            },
        }
    }
}

/// Reads proposals and vote tallies from the voting contract
#[derive(Debug, Clone)]
pub struct ProposalQueryClient<Q> {
    backend: Q,
    contract_address: String,
    code_hash: String,
}

impl<Q: ComputeQuery> ProposalQueryClient<Q> {
    /// Query the voting contract named in `config` through `backend`
    pub fn new(backend: Q, config: &RelayConfig) -> Self {
        Self {
            backend,
            contract_address: config.routing_contract.clone(),
            code_hash: config.routing_code_hash.clone(),
        }
    }

    /// The query backend
    pub fn backend(&self) -> &Q {
        &self.backend
    }

    async fn run<T: DeserializeOwned>(&self, query: QueryMsg) -> QueryOutcome<T> {
        let query = ContractQuery {
            contract_address: self.contract_address.clone(),
            code_hash: self.code_hash.clone(),
            query,
        };
        QueryOutcome::classify(self.backend.query_contract(&query).await)
    }

    /// The proposal stored under `key`
    pub async fn retrieve_proposal(&self, key: u32) -> QueryOutcome<ProposalRecord> {
        self.run(QueryMsg::RetrieveProposal { key }).await
    }

    /// The votes cast for the proposal stored under `key`
    pub async fn retrieve_votes(&self, key: u32) -> QueryOutcome<VoteTally> {
        self.run(QueryMsg::RetrieveVotes { key }).await
    }

    /// Every stored proposal, read one key at a time from 1 until the first
    /// empty key. A query error also ends the listing, so a transient
    /// failure truncates the result.
    #[tracing::instrument(skip(self), fields(contract = %self.contract_address))]
    pub async fn query_all_proposals(&self) -> Vec<Proposal> {
        let mut proposals = vec![];
        let mut key = 1u32;
        loop {
            match self.retrieve_proposal(key).await {
                QueryOutcome::Found(record) => proposals.push(Proposal { key, record }),
                QueryOutcome::NotFound => {
                    tracing::debug!(key, "No proposal stored, listing complete");
                    break;
                }
                QueryOutcome::QueryError(reason) => {
                    tracing::warn!(key, %reason, "Proposal query failed, listing truncated");
                    break;
                }
            }
            key = match key.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        proposals
    }

    /// Vote tallies for `proposals`, in order. An empty key yields
    /// [`VoteTally::empty`] and a failed query [`VoteTally::unavailable`].
    #[tracing::instrument(skip_all, fields(count = proposals.len()))]
    pub async fn query_votes_for(&self, proposals: &[Proposal]) -> Vec<VoteTally> {
        let mut tallies = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let tally = match self.retrieve_votes(proposal.key).await {
                QueryOutcome::Found(tally) => tally,
                QueryOutcome::NotFound => VoteTally::empty(),
                QueryOutcome::QueryError(reason) => {
                    tracing::warn!(key = proposal.key, %reason, "Vote query failed");
                    VoteTally::unavailable()
                }
            };
            tallies.push(tally);
        }
        tallies
    }

    /// Every stored proposal alongside its tally
    pub async fn proposals_with_votes(&self) -> Vec<(Proposal, VoteTally)> {
        let proposals = self.query_all_proposals().await;
        let tallies = self.query_votes_for(&proposals).await;
        proposals.into_iter().zip(tallies).collect()
    }
}
