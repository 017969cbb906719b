use serde::{Deserialize, Serialize};

/// Query against a contract on the compute chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractQuery {
    /// Contract address
    pub contract_address: String,
    /// Contract code hash
    pub code_hash: String,
    /// Query message
    pub query: QueryMsg,
}

/// Voting contract query messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    /// Fetch the proposal stored under `key`
    RetrieveProposal {
        /// Proposal key, starting at 1
        key: u32,
    },
    /// Fetch the vote tally of the proposal stored under `key`
    RetrieveVotes {
        /// Proposal key, starting at 1
        key: u32,
    },
}

/// A stored proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalRecord {
    /// Status message from the contract
    pub message: String,
    /// Block height at which voting closes
    pub end_time: u64,
    /// Project name
    pub name: String,
    /// Project description
    pub description: String,
}

/// A proposal together with the key it is stored under
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    /// Storage key
    pub key: u32,
    /// Stored record
    #[serde(flatten)]
    pub record: ProposalRecord,
}

impl std::ops::Deref for Proposal {
    type Target = ProposalRecord;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

/// Votes cast for one proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    /// Status message from the contract
    pub message: String,
    /// Number of ballots
    pub vote_count: usize,
    /// One line per ballot
    pub vote_details: Vec<String>,
    /// Summed vote weight
    pub total_votes: u32,
}

impl VoteTally {
    /// Placeholder for a proposal with no recorded votes
    pub fn empty() -> Self {
        Self::zero("No votes available for this item")
    }

    /// Placeholder for a proposal whose votes could not be fetched
    pub fn unavailable() -> Self {
        Self::zero("Error fetching votes")
    }

    fn zero(message: &str) -> Self {
        Self {
            message: message.to_owned(),
            vote_count: 0,
            vote_details: vec![],
            total_votes: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_shape() {
        let query = ContractQuery {
            contract_address: "secret1abc".to_owned(),
            code_hash: "00ff".to_owned(),
            query: QueryMsg::RetrieveProposal { key: 3 },
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({
                "contract_address": "secret1abc",
                "code_hash": "00ff",
                "query": {"retrieve_proposal": {"key": 3}},
            })
        );
        assert_eq!(
            serde_json::to_value(QueryMsg::RetrieveVotes { key: 1 }).unwrap(),
            serde_json::json!({"retrieve_votes": {"key": 1}})
        );
    }

    #[test]
    fn proposal_flattens_record() {
        let proposal = Proposal {
            key: 2,
            record: ProposalRecord {
                message: "Retrieved value successfully".to_owned(),
                end_time: 1200,
                name: "Relay".to_owned(),
                description: "d".to_owned(),
            },
        };
        let value = serde_json::to_value(&proposal).unwrap();
        assert_eq!(value["key"], 2);
        assert_eq!(value["name"], "Relay");
        assert_eq!(proposal.end_time, 1200);
    }
}
