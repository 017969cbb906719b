use std::env;

use qv_relay::*;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // the config must at least name a query proxy in `query_url`
    let Some(path) = env::args().nth(1) else {
        eyre::bail!("usage: proposals <config.json>");
    };
    let config = RelayConfig::from_json(&std::fs::read_to_string(path)?)?;

    let client = ProposalQueryClient::new(HttpComputeQuery::from_config(&config)?, &config);
    for (proposal, tally) in client.proposals_with_votes().await {
        println!(
            "#{} {} (ends at {}): {} votes from {} ballots",
            proposal.key, proposal.name, proposal.end_time, tally.total_votes, tally.vote_count
        );
    }

    Ok(())
}
