//! The wallet provider abstraction.

use async_trait::async_trait;
use ballot_types::{AccountAddress, ChainId, TxHash};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::ProviderError;

/// A state-changing transaction for the wallet to sign and broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: AccountAddress,
    pub to: AccountAddress,
    /// ABI-encoded call data, `0x`-prefixed hex.
    pub data: String,
}

impl TransactionRequest {
    pub fn new(from: AccountAddress, to: AccountAddress, data: &[u8]) -> Self {
        Self {
            from,
            to,
            data: format!("0x{}", hex::encode(data)),
        }
    }
}

/// An EIP-1193 style wallet: a single request entry point plus two
/// notification streams.
///
/// Implementations must be cheap to share; the connection manager, the
/// contract gateway and every signing context hold the same provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a raw JSON-RPC request and return its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Notifications carrying the new account set, first entry active.
    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<AccountAddress>>;

    /// Notifications carrying the new chain id.
    fn subscribe_chain(&self) -> broadcast::Receiver<ChainId>;

    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        let result = self
            .request("eth_requestAccounts", Value::Array(Vec::new()))
            .await?;
        parse_accounts(result)
    }

    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        let result = self.request("eth_accounts", Value::Array(Vec::new())).await?;
        parse_accounts(result)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let result = self.request("eth_chainId", Value::Array(Vec::new())).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ProviderError::invalid_response("eth_chainId: expected a string"))?;
        ChainId::from_hex(raw).map_err(|e| ProviderError::invalid_response(e.to_string()))
    }

    /// Sign and broadcast a transaction from `tx.from`.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError> {
        let params = serde_json::to_value([tx])
            .map_err(|e| ProviderError::invalid_response(format!("encode transaction: {e}")))?;
        let result = self.request("eth_sendTransaction", params).await?;
        let raw = result.as_str().ok_or_else(|| {
            ProviderError::invalid_response("eth_sendTransaction: expected a hash string")
        })?;
        TxHash::from_hex(raw).map_err(|e| ProviderError::invalid_response(e.to_string()))
    }
}

/// Parse a JSON array of address strings.
pub fn parse_accounts(value: Value) -> Result<Vec<AccountAddress>, ProviderError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ProviderError::invalid_response("expected an array of accounts"))?;
    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .ok_or_else(|| ProviderError::invalid_response("account is not a string"))
                .and_then(|raw| {
                    AccountAddress::parse(raw)
                        .map_err(|e| ProviderError::invalid_response(e.to_string()))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accounts_accepts_address_list() {
        let accounts = parse_accounts(json!([
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222"
        ]))
        .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0], AccountAddress::new([0x11; 20]));
    }

    #[test]
    fn parse_accounts_rejects_garbage() {
        assert!(parse_accounts(json!("0x11")).is_err());
        assert!(parse_accounts(json!([42])).is_err());
        assert!(parse_accounts(json!(["0x12"])).is_err());
    }

    #[test]
    fn transaction_request_serializes_hex_fields() {
        let tx = TransactionRequest::new(
            AccountAddress::new([0x11; 20]),
            AccountAddress::new([0x22; 20]),
            &[0xde, 0xad],
        );
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["data"], "0xdead");
        assert_eq!(value["to"], "0x2222222222222222222222222222222222222222");
    }
}
