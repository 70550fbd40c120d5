//! The JSON-RPC gateway driven through a scripted wallet.

use std::sync::Arc;
use std::time::Duration;

use ballot_gateway::{ContractCall, ElectionContract, FailureReason, GatewayError, RpcElectionContract};
use ballot_nullables::NullWallet;
use ballot_types::{AccountAddress, Candidate, ChainId, ElectionPhase, TxHash};
use ballot_wallet::{ProviderError, SigningContext, WalletProvider};
use ethers_core::abi::{self, Token};
use ethers_core::types::U256;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CONTRACT: AccountAddress = AccountAddress::new([0xc0; 20]);
const ALICE: AccountAddress = AccountAddress::new([0x0a; 20]);

fn setup() -> (Arc<NullWallet>, RpcElectionContract, SigningContext) {
    let wallet = Arc::new(NullWallet::new(vec![ALICE], ChainId(31337)));
    let provider: Arc<dyn WalletProvider> = wallet.clone();
    let contract = RpcElectionContract::new(Arc::clone(&provider), CONTRACT)
        .with_receipt_polling(Duration::from_millis(1), 3);
    let signer = SigningContext::new(ALICE, provider);
    (wallet, contract, signer)
}

fn returns(tokens: &[Token]) -> Result<Value, ProviderError> {
    Ok(json!(format!("0x{}", hex::encode(abi::encode(tokens)))))
}

fn uint(value: u64) -> Token {
    Token::Uint(U256::from(value))
}

fn receipt(status: &str) -> Result<Value, ProviderError> {
    Ok(json!({ "status": status, "blockNumber": "0x2a", "gasUsed": "0x5208" }))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reads_decode_contract_return_data() {
    let (wallet, contract, _) = setup();
    wallet.respond("eth_call", returns(&[Token::Address(ALICE.to_h160())]));
    wallet.respond("eth_call", returns(&[uint(2)]));
    wallet.respond(
        "eth_call",
        returns(&[Token::Bool(true), Token::Bool(false), uint(0)]),
    );
    wallet.respond("eth_call", returns(&[uint(1)]));
    wallet.respond(
        "eth_call",
        returns(&[Token::Tuple(vec![uint(1), Token::String("Alice".into()), uint(4)])]),
    );

    assert_eq!(contract.owner().await.unwrap(), ALICE);
    assert_eq!(contract.phase().await.unwrap(), ElectionPhase::Finished);
    assert!(contract.voter(ALICE).await.unwrap().can_vote());
    assert_eq!(contract.candidate_count().await.unwrap(), 1);
    assert_eq!(contract.candidate(0).await.unwrap(), Candidate::new(1, "Alice", 4));

    let calls: Vec<_> = wallet
        .requests()
        .into_iter()
        .filter(|(m, _)| m == "eth_call")
        .collect();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0].1[0]["to"], json!(CONTRACT));
    assert_eq!(calls[0].1[1], "latest");
}

#[tokio::test]
async fn provider_failure_is_a_read_error() {
    let (wallet, contract, _) = setup();
    wallet.respond("eth_call", Err(ProviderError::unreachable("connection refused")));
    assert!(matches!(
        contract.candidate_count().await,
        Err(GatewayError::RemoteRead(_))
    ));
}

#[tokio::test]
async fn empty_return_data_is_a_read_error() {
    let (wallet, contract, _) = setup();
    wallet.respond("eth_call", Ok(json!("0x")));
    assert!(matches!(contract.phase().await, Err(GatewayError::RemoteRead(_))));
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_sends_encoded_call_from_signer() {
    let (wallet, contract, signer) = setup();
    let pending = contract.submit(&signer, &ContractCall::Vote(2)).await.unwrap();
    assert_eq!(pending.call, ContractCall::Vote(2));

    let requests = wallet.requests();
    let (method, params) = requests.last().unwrap();
    assert_eq!(method, "eth_sendTransaction");
    assert_eq!(params[0]["from"], json!(ALICE));
    assert_eq!(params[0]["to"], json!(CONTRACT));
    let expected = format!("0x{}", hex::encode(ContractCall::Vote(2).encode()));
    assert_eq!(params[0]["data"], expected);
}

#[tokio::test]
async fn declined_signature_is_a_submission_rejection() {
    let (wallet, contract, signer) = setup();
    wallet.reject_signing();
    assert!(matches!(
        contract.submit(&signer, &ContractCall::StartVoting).await,
        Err(GatewayError::SubmissionRejected(_))
    ));
}

#[tokio::test]
async fn confirmation_waits_for_receipt() {
    let (wallet, contract, signer) = setup();
    let pending = contract.submit(&signer, &ContractCall::EndVoting).await.unwrap();

    wallet.respond("eth_getTransactionReceipt", Ok(Value::Null));
    wallet.respond(
        "eth_getTransactionByHash",
        Ok(json!({ "from": ALICE, "nonce": "0x5" })),
    );
    wallet.respond("eth_getTransactionReceipt", receipt("0x1"));

    let mined = contract.await_confirmation(&pending).await.unwrap();
    assert_eq!(mined.tx_hash, pending.hash);
    assert_eq!(mined.block_number, 42);
    assert_eq!(mined.gas_used, Some(21_000));
    assert_eq!(wallet.count("eth_getTransactionReceipt"), 2);
}

#[tokio::test]
async fn reverted_receipt_fails_confirmation() {
    let (wallet, contract, signer) = setup();
    let pending = contract
        .submit(&signer, &ContractCall::AddCandidate("Carol".into()))
        .await
        .unwrap();
    wallet.respond("eth_getTransactionReceipt", receipt("0x0"));

    match contract.await_confirmation(&pending).await {
        Err(GatewayError::ConfirmationFailed { reason, .. }) => {
            assert_eq!(reason, FailureReason::Reverted)
        }
        other => panic!("expected revert, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_transaction_is_dropped() {
    let (wallet, contract, signer) = setup();
    let pending = contract.submit(&signer, &ContractCall::StartVoting).await.unwrap();
    for _ in 0..3 {
        wallet.respond("eth_getTransactionReceipt", Ok(Value::Null));
        wallet.respond("eth_getTransactionByHash", Ok(Value::Null));
    }

    match contract.await_confirmation(&pending).await {
        Err(GatewayError::ConfirmationFailed { reason, .. }) => {
            assert_eq!(reason, FailureReason::Dropped);
            assert!(reason.may_have_landed());
        }
        other => panic!("expected drop, got {other:?}"),
    }
}

#[tokio::test]
async fn consumed_nonce_means_replaced() {
    let (wallet, contract, signer) = setup();
    let pending = contract.submit(&signer, &ContractCall::StartVoting).await.unwrap();

    wallet.respond("eth_getTransactionReceipt", Ok(Value::Null));
    wallet.respond(
        "eth_getTransactionByHash",
        Ok(json!({ "from": ALICE, "nonce": "0x5" })),
    );
    wallet.respond("eth_getTransactionReceipt", Ok(Value::Null));
    wallet.respond("eth_getTransactionByHash", Ok(Value::Null));
    wallet.respond("eth_getTransactionCount", Ok(json!("0x6")));

    match contract.await_confirmation(&pending).await {
        Err(GatewayError::ConfirmationFailed { reason, .. }) => {
            assert_eq!(reason, FailureReason::Replaced)
        }
        other => panic!("expected replacement, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_poll_error_does_not_end_the_wait() {
    let (wallet, contract, signer) = setup();
    let pending = contract.submit(&signer, &ContractCall::EndVoting).await.unwrap();
    wallet.respond(
        "eth_getTransactionReceipt",
        Err(ProviderError::unreachable("node went away")),
    );
    wallet.respond("eth_getTransactionReceipt", receipt("0x1"));

    let mined = contract.await_confirmation(&pending).await.unwrap();
    assert_eq!(mined.tx_hash, pending.hash);
    assert_eq!(wallet.count("eth_getTransactionReceipt"), 2);
}

#[tokio::test]
async fn persistent_poll_errors_are_unknown_failure() {
    let (wallet, contract, _) = setup();
    let pending = ballot_gateway::PendingTx {
        hash: TxHash::new([9; 32]),
        call: ContractCall::EndVoting,
    };
    for _ in 0..3 {
        wallet.respond(
            "eth_getTransactionReceipt",
            Err(ProviderError::unreachable("node went away")),
        );
    }

    match contract.await_confirmation(&pending).await {
        Err(GatewayError::ConfirmationFailed { reason, .. }) => {
            assert_eq!(reason, FailureReason::Unknown);
            assert!(reason.may_have_landed());
        }
        other => panic!("expected unknown outcome, got {other:?}"),
    }
    assert_eq!(wallet.count("eth_getTransactionReceipt"), 3);
}
