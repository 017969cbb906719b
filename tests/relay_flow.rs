mod common;

use std::{collections::BTreeMap, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine};
use common::MockWallet;
use ethers_core::{
    abi::{self, ParamType, Token},
    types::{Address, Log, NameOrAddress, U256},
};
use ethers_signers::{LocalWallet, Signer};
use qv_relay::{
    relay::send_selector,
    submit::{relay_fee, HIGH_FEE_MULTIPLIER},
    *,
};

const BASE_SEPOLIA: u64 = 84532;
const LISK_SEPOLIA: u64 = 4202;

fn ballot() -> VoteCart {
    let mut cart = VoteCart::new();
    cart.add("1", "Project 1").unwrap();
    cart.add("2", "Project 2").unwrap();
    cart.set_amount("1", 10).unwrap();
    cart.set_amount("2", 5).unwrap();
    cart
}

fn send_params() -> Vec<ParamType> {
    vec![
        ParamType::FixedBytes(32),
        ParamType::Address,
        ParamType::String,
        ParamType::Tuple(vec![
            ParamType::Bytes,
            ParamType::Bytes,
            ParamType::String,
            ParamType::String,
            ParamType::String,
            ParamType::FixedBytes(12),
            ParamType::Uint(32),
            ParamType::Bytes,
            ParamType::Bytes,
        ]),
    ]
}

#[tokio::test]
async fn base_sepolia_ballot() {
    let client = VotingClient::new(MockWallet::new(BASE_SEPOLIA)).unwrap();
    let sender = client.wallet().address();

    let destination: Address = "0x3879E146140b627a5C858a08e507B171D9E43139".parse().unwrap();
    assert_eq!(resolve_destination(BASE_SEPOLIA), Some(destination));

    let relay = client
        .prepare_votes(BASE_SEPOLIA, sender, &ballot())
        .await
        .unwrap();

    assert_eq!(relay.destination, destination);
    assert_eq!(relay.info().handle.as_str(), "create_vote");
    assert_eq!(relay.info().nonce.len(), 12);
    assert_eq!(relay.info().user_key.len(), 33);
    assert_eq!(relay.info().user_pubkey.len(), 65);
    assert_eq!(relay.info().task_destination_network, "pulsar-3");
    assert_eq!(relay.call.routing_info, config::ROUTING_CONTRACT);
    assert_eq!(relay.call.user_address, sender);

    // the signature is over the ciphertext hash and verifies against the sender
    let ciphertext_hash = ethers_core::utils::keccak256(&relay.info().payload);
    relay
        .info()
        .payload_signature
        .verify(&ciphertext_hash[..], sender)
        .unwrap();
    assert_eq!(relay.payload_hash(), qv_relay::relay::payload_hash(ciphertext_hash.into()));
}

#[tokio::test]
async fn gateway_recovers_the_ballot() {
    let gateway_secret = EphemeralKey::from_bytes(&[0x42; 32]).unwrap();
    let config = RelayConfig {
        gateway_public_key: STANDARD.encode(gateway_secret.public_key_bytes()),
        ..Default::default()
    };
    let client = VotingClient::with_config(MockWallet::new(BASE_SEPOLIA), config).unwrap();
    let sender = client.wallet().address();

    let relay = client
        .prepare_votes(BASE_SEPOLIA, sender, &ballot())
        .await
        .unwrap();
    let info = relay.info();

    let ephemeral = k256::PublicKey::from_sec1_bytes(&info.user_key).unwrap();
    let secret = gateway_secret.agree(&ephemeral).unwrap();
    let envelope = SealedEnvelope::from_parts(info.nonce, info.payload.to_vec()).unwrap();
    let payload: RelayPayload = serde_json::from_slice(&envelope.open(&secret).unwrap()).unwrap();

    assert_eq!(payload.user_address, sender);
    assert_eq!(payload.user_key, info.user_key.to_vec());
    assert_eq!(payload.routing_code_hash, config::ROUTING_CODE_HASH);
    assert_eq!(payload.callback_address, relay.destination.as_bytes().to_vec());
    assert_eq!(payload.callback_gas_limit, 300_000);

    let ballot: VoteInput = serde_json::from_str(&payload.data).unwrap();
    assert_eq!(
        ballot.votes,
        BTreeMap::from([("1".to_owned(), 10), ("2".to_owned(), 5)])
    );
    assert_eq!(ballot.wallet_address, sender);
}

#[tokio::test]
async fn proposal_transaction_shape() {
    let client = VotingClient::new(MockWallet::new(LISK_SEPOLIA)).unwrap();
    let sender = client.wallet().address();

    client
        .create_proposal(LISK_SEPOLIA, &ProposalInput::new("Relay", "Cross-chain votes"))
        .await
        .unwrap();

    let sent = client.wallet().sent();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];

    let gas_price = client.wallet().gas_price;
    assert_eq!(tx.from, Some(sender));
    assert_eq!(
        tx.to,
        Some(NameOrAddress::Address(Chain::LiskSepolia.public_client()))
    );
    assert_eq!(tx.gas, Some(U256::from(150_000u64)));
    assert_eq!(tx.value, Some(relay_fee(gas_price, 300_000, LISK_SEPOLIA)));
    assert_eq!(
        tx.value,
        Some(gas_price * U256::from(300_000u64) * U256::from(HIGH_FEE_MULTIPLIER) / 2)
    );

    let data = tx.data.as_ref().unwrap();
    assert_eq!(&data[..4], &send_selector());
    let tokens = abi::decode(&send_params(), &data[4..]).unwrap();
    assert_eq!(tokens[1], Token::Address(sender));
    let Token::Tuple(info) = &tokens[3] else {
        panic!("expected tuple")
    };
    assert_eq!(info[4], Token::String("create_proposal".to_owned()));
    assert_eq!(info[6], Token::Uint(U256::from(300_000u64)));
}

#[tokio::test]
async fn other_chains_use_the_default_multiplier() {
    let client = VotingClient::new(MockWallet::new(BASE_SEPOLIA)).unwrap();
    client
        .create_proposal(BASE_SEPOLIA, &ProposalInput::new("a", "b"))
        .await
        .unwrap();
    let gas_price = client.wallet().gas_price;
    assert_eq!(
        client.wallet().sent()[0].value,
        Some(gas_price * U256::from(300_000u64) * U256::from(3u64) / 2)
    );
}

#[tokio::test]
async fn unsupported_chain_is_an_error() {
    let client = VotingClient::new(MockWallet::new(31337)).unwrap();
    let result = client
        .create_proposal(31337, &ProposalInput::new("a", "b"))
        .await;
    assert!(matches!(result, Err(RelayError::UnsupportedChain(31337))));
    assert!(client.wallet().sent().is_empty());
}

#[tokio::test]
async fn confirmed_ballot_clears_the_cart() {
    let wallet = MockWallet::new(BASE_SEPOLIA);
    wallet
        .pending_polls
        .store(2, std::sync::atomic::Ordering::SeqCst);
    let client = VotingClient::new(wallet)
        .unwrap()
        .confirmation_polling(5, Duration::from_millis(5));

    let mut cart = ballot();
    let receipt = client.submit_votes(BASE_SEPOLIA, &mut cart).await.unwrap();
    assert_eq!(receipt.status, Some(1u64.into()));
    assert!(cart.is_empty());
    assert_eq!(client.wallet().sent().len(), 1);
}

#[tokio::test]
async fn ballot_receipt_carries_votes_created() {
    let event = abi::Event {
        name: "votes_created".to_owned(),
        inputs: vec![abi::EventParam {
            name: "total".to_owned(),
            kind: ParamType::Uint(256),
            indexed: false,
        }],
        anonymous: false,
    };
    let mut wallet = MockWallet::new(BASE_SEPOLIA);
    wallet.receipt_logs = vec![Log {
        topics: vec![event.signature()],
        data: abi::encode(&[Token::Uint(U256::from(15u64))]).into(),
        ..Default::default()
    }];
    let client = VotingClient::new(wallet)
        .unwrap()
        .votes_created_event(event.clone())
        .confirmation_polling(1, Duration::from_millis(5));

    let mut cart = ballot();
    let receipt = client.submit_votes(BASE_SEPOLIA, &mut cart).await.unwrap();
    assert!(cart.is_empty());

    let created = decode_logs(&receipt, &event);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].params[0].value, Token::Uint(U256::from(15u64)));
}

#[tokio::test]
async fn failed_ballots_keep_the_cart() {
    let mut reverting = MockWallet::new(BASE_SEPOLIA);
    reverting.receipt_status = 0;
    let client = VotingClient::new(reverting)
        .unwrap()
        .confirmation_polling(1, Duration::from_millis(5));
    let mut cart = ballot();
    assert!(matches!(
        client.submit_votes(BASE_SEPOLIA, &mut cart).await,
        Err(RelayError::Confirmation(ConfirmationError::Reverted(_)))
    ));
    assert_eq!(cart, ballot());

    let mut rejecting = MockWallet::new(BASE_SEPOLIA);
    rejecting.reject_sends = true;
    let client = VotingClient::new(rejecting).unwrap();
    let err = client.submit_votes(BASE_SEPOLIA, &mut cart).await.unwrap_err();
    assert!(err.is_rejection(), "{err}");
    assert_eq!(cart, ballot());

    let never_mined = MockWallet::new(BASE_SEPOLIA);
    never_mined
        .pending_polls
        .store(usize::MAX, std::sync::atomic::Ordering::SeqCst);
    let client = VotingClient::new(never_mined)
        .unwrap()
        .confirmation_polling(2, Duration::from_millis(5));
    assert!(matches!(
        client.submit_votes(BASE_SEPOLIA, &mut cart).await,
        Err(RelayError::Confirmation(ConfirmationError::TooManyRetries))
    ));
    assert_eq!(cart, ballot());

    let mut failing_node = MockWallet::new(BASE_SEPOLIA);
    failing_node.receipt_error = Some(-32000);
    let client = VotingClient::new(failing_node)
        .unwrap()
        .confirmation_polling(40, Duration::from_millis(5));
    assert!(matches!(
        client.submit_votes(BASE_SEPOLIA, &mut cart).await,
        Err(RelayError::Confirmation(ConfirmationError::Wallet(
            WalletError::Rpc { code: -32000, .. }
        )))
    ));
    assert_eq!(cart, ballot());

    let mut empty = VoteCart::new();
    assert!(matches!(
        client.submit_votes(BASE_SEPOLIA, &mut empty).await,
        Err(RelayError::EmptyVotes)
    ));
}

#[tokio::test]
async fn another_account_cannot_sign() {
    let client = VotingClient::new(MockWallet::new(BASE_SEPOLIA)).unwrap();
    let sender = client.wallet().address();
    let sealed = client
        .builder()
        .chain_id(BASE_SEPOLIA)
        .sender(sender)
        .handle(Handle::CreateProposal)
        .message(&ProposalInput::new("a", "b"))
        .unwrap()
        .seal(&client.config().gateway_key().unwrap())
        .unwrap();

    let intruder: LocalWallet = "33".repeat(32).parse().unwrap();
    let signature = intruder
        .sign_message(sealed.ciphertext_hash())
        .await
        .unwrap();
    match sealed.sign_with(signature) {
        Err(RelayError::WrongSigner { expected, actual }) => {
            assert_eq!(expected, sender);
            assert_eq!(actual, intruder.address());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn chain_watch_follows_the_wallet() {
    let client = VotingClient::new(MockWallet::new(BASE_SEPOLIA)).unwrap();
    {
        let watch = client.watch_chain().await.unwrap();
        assert_eq!(watch.current(), Some(BASE_SEPOLIA));
        assert_eq!(watch.chain(), Some(Chain::BaseSepolia));
        assert_eq!(client.wallet().listeners.len(), 1);

        client.wallet().switch_chain(LISK_SEPOLIA);
        assert_eq!(watch.chain(), Some(Chain::LiskSepolia));
        assert_eq!(watch.destination(), resolve_destination(LISK_SEPOLIA));

        client.wallet().listeners.emit("not a chain id");
        assert_eq!(watch.current(), Some(LISK_SEPOLIA));

        client.wallet().switch_chain(31337);
        assert_eq!(watch.current(), Some(31337));
        assert_eq!(watch.chain(), None);
        assert_eq!(watch.destination(), None);
    }
    assert!(client.wallet().listeners.is_empty());
}
