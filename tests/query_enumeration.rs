mod common;

use common::MockCompute;
use qv_relay::{rpc::QueryMsg, *};

fn client(backend: MockCompute) -> ProposalQueryClient<MockCompute> {
    ProposalQueryClient::new(backend, &RelayConfig::default())
}

#[tokio::test]
async fn it_stops_at_the_first_empty_key() {
    let client = client(MockCompute::with_proposals(5));

    let proposals = client.query_all_proposals().await;
    assert_eq!(
        proposals.iter().map(|p| p.key).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(proposals[2].name, "Project 3");
    assert_eq!(proposals[4].end_time, 1005);

    let queried = client.backend().queried();
    assert_eq!(queried.len(), 6);
    assert_eq!(queried.last(), Some(&QueryMsg::RetrieveProposal { key: 6 }));
    assert!(!queried.contains(&QueryMsg::RetrieveProposal { key: 7 }));
}

#[tokio::test]
async fn empty_contract_lists_nothing() {
    let client = client(MockCompute::with_proposals(0));
    assert!(client.query_all_proposals().await.is_empty());
    assert_eq!(
        client.backend().queried(),
        vec![QueryMsg::RetrieveProposal { key: 1 }]
    );
}

#[tokio::test]
async fn failed_vote_query_gets_a_placeholder() {
    let mut backend = MockCompute::with_proposals(5);
    backend.failing_votes = vec![3];
    let client = client(backend);

    let proposals = client.query_all_proposals().await;
    let tallies = client.query_votes_for(&proposals).await;

    assert_eq!(tallies.len(), 5);
    assert_eq!(tallies[2], rpc::VoteTally::unavailable());
    assert_eq!(tallies[2].total_votes, 0);
    assert_eq!(tallies[2].message, "Error fetching votes");
    for (i, tally) in tallies.iter().enumerate().filter(|(i, _)| *i != 2) {
        assert_eq!(tally.total_votes, i as u32 + 1);
    }
}

#[tokio::test]
async fn transport_errors_truncate_the_listing() {
    let mut backend = MockCompute::with_proposals(5);
    backend.failing_proposal = Some(4);
    let client = client(backend);

    let proposals = client.query_all_proposals().await;
    assert_eq!(proposals.len(), 3);
}

#[tokio::test]
async fn proposals_come_with_their_tallies() {
    let client = client(MockCompute::with_proposals(2));
    let listed = client.proposals_with_votes().await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].0.key, 2);
    assert_eq!(listed[1].1.total_votes, 2);
    assert_eq!(
        client.retrieve_votes(9).await,
        QueryOutcome::NotFound
    );
}
