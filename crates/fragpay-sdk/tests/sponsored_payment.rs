mod support;

use std::time::Duration;

use alloy_primitives::Address;
use fragment_core::{ChangeAdvisor, ChangeAction, CoinSelector, Fragment, InMemorySource};
use fragpay_sdk::{Error, PaymentCoordinator, PaymentRequest, SponsoredExecutor};
use httpmock::prelude::*;
use serde_json::json;
use sponsor_rpc::SponsorClient;

use support::*;

fn coordinator(
    server: &MockServer,
    chain: &MockChain,
    ids: &[u8],
    change_recipient: Option<Address>,
) -> PaymentCoordinator<SponsorClient> {
    let client = SponsorClient::new(&server.url("/relay"), None, Duration::from_secs(5)).unwrap();
    let mut request = PaymentRequest::new(destination(), token());
    request.change_recipient = change_recipient;
    PaymentCoordinator::new(
        CoinSelector::default(),
        ChangeAdvisor::default(),
        builder(chain, keyring(ids)),
        SponsoredExecutor::new(client),
        request,
    )
}

fn fragments() -> Vec<Fragment> {
    vec![fragment(1, "0.0001"), fragment(2, "0.0002")]
}

#[test]
fn pays_through_the_sponsor_in_one_call() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/relay")
            .body_contains("\"operation_type\":\"payment\"")
            .body_contains("multicallData");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "success": true,
                "data": {
                    "transactionHash": "0xfeed",
                    "blockNumber": "19000001",
                    "gasUsed": 412000,
                    "gasCost": "0.0004",
                    "sponsorAddress": "0x5000000000000000000000000000000000000005",
                    "executionDetails": {"explorerUrl": "https://basescan.org/tx/0xfeed", "chainName": "base"}
                }
            }));
    });

    let chain = MockChain::default();
    let receipt = coordinator(&server, &chain, &[1, 2], None)
        .pay(&fragments(), amount("0.0003"))
        .unwrap();
    mock.assert();

    assert_eq!(receipt.result.transaction_hash, "0xfeed");
    assert_eq!(receipt.result.gas_used, "412000");
    assert_eq!(receipt.result.chain_name, "base");
    assert!(receipt.plan.selection.change.is_zero());
    // two fresh wallets: two deployments and two transfers
    assert_eq!(receipt.plan.batch.operations.len(), 4);
    assert!(receipt.plan.validation.is_valid);
    assert_eq!(receipt.plan.metadata.fragment_count, Some(2));
    assert_eq!(receipt.plan.metadata.total_amount.as_deref(), Some("0.0003"));
}

#[test]
fn insufficient_funds_never_reaches_the_sponsor() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/relay");
        then.status(200).json_body(json!({"success": true}));
    });

    let chain = MockChain::default();
    let err = coordinator(&server, &chain, &[1, 2], None)
        .pay(&fragments(), amount("0.001"))
        .unwrap_err();
    mock.assert_hits(0);
    assert_eq!(
        err,
        Error::InsufficientFunds {
            requested: amount("0.001"),
            available: amount("0.0003"),
        }
    );
}

#[test]
fn sponsor_failure_surfaces_status_and_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/relay");
        then.status(429)
            .header("content-type", "application/json")
            .json_body(json!({"success": false, "error": "rate limited"}));
    });

    let chain = MockChain::default();
    let err = coordinator(&server, &chain, &[1, 2], None)
        .pay(&fragments(), amount("0.0003"))
        .unwrap_err();
    assert_eq!(
        err,
        Error::SponsorshipFailed {
            message: "rate limited".into(),
            status: Some(429),
            network: false,
        }
    );
    assert!(!err.is_retryable());
}

#[test]
fn excessive_change_goes_to_change_recipient() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/relay")
            .body_contains("payment_with_change");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"success": true, "data": {"transactionHash": "0xc4a4"}}));
    });

    let chain = MockChain::default();
    let big = fragment(3, "0.0005");
    chain.deploy(big.wallet_address, 0);
    let recipient = Address::repeat_byte(0xC4);
    let receipt = coordinator(&server, &chain, &[3], Some(recipient))
        .pay(&[big], amount("0.0003"))
        .unwrap();
    mock.assert();

    assert_eq!(receipt.plan.change.recommended_action, ChangeAction::CreateChangeFragment);
    assert_eq!(receipt.plan.batch.change, amount("0.0002"));
    assert_eq!(receipt.plan.batch.operations.len(), 2);
    assert_eq!(receipt.result.gas_cost, "N/A");
}

#[test]
fn change_stays_behind_without_a_recipient() {
    let server = MockServer::start();
    let chain = MockChain::default();
    let big = fragment(3, "0.0005");
    chain.deploy(big.wallet_address, 0);

    let plan = coordinator(&server, &chain, &[3], None)
        .plan(&[big], amount("0.0003"))
        .unwrap();
    assert_eq!(plan.batch.operations.len(), 1);
    assert_eq!(plan.batch.amount, amount("0.0003"));
    assert!(plan.batch.change.is_zero());
}

#[test]
fn pays_from_a_fragment_source_in_the_request_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/relay");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"success": true, "data": {"transactionHash": "0x01"}}));
    });

    let mut foreign = fragment(4, "1");
    foreign.token_address = Address::repeat_byte(0x01);
    let mut all = fragments();
    all.push(foreign);
    let source = InMemorySource::from_fragments(all);

    let chain = MockChain::default();
    let receipt = coordinator(&server, &chain, &[1, 2], None)
        .pay_from_source(&source, amount("0.0003"))
        .unwrap();
    mock.assert();
    assert_eq!(receipt.plan.selection.fragment_count(), 2);
}
