//! Nullable wallet: a scripted provider that records requests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use ballot_types::{AccountAddress, ChainId, TxHash};
use ballot_wallet::{ProviderError, WalletProvider};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// A test wallet.
///
/// Built-in behavior covers account authorization, chain id and transaction
/// hashes. Any other method (e.g. `eth_call`) is answered from responses
/// queued with [`NullWallet::respond`], in order.
pub struct NullWallet {
    accounts: Mutex<Vec<AccountAddress>>,
    chain_id: Mutex<ChainId>,
    reject_access: Mutex<bool>,
    reject_signing: Mutex<bool>,
    scripted: Mutex<HashMap<String, VecDeque<Result<Value, ProviderError>>>>,
    requests: Mutex<Vec<(String, Value)>>,
    sent_count: Mutex<u64>,
    accounts_tx: broadcast::Sender<Vec<AccountAddress>>,
    chain_tx: broadcast::Sender<ChainId>,
}

impl NullWallet {
    pub fn new(accounts: Vec<AccountAddress>, chain_id: ChainId) -> Self {
        let (accounts_tx, _) = broadcast::channel(16);
        let (chain_tx, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(accounts),
            chain_id: Mutex::new(chain_id),
            reject_access: Mutex::new(false),
            reject_signing: Mutex::new(false),
            scripted: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            sent_count: Mutex::new(0),
            accounts_tx,
            chain_tx,
        }
    }

    /// A wallet with one account on the local dev chain.
    pub fn single(account: AccountAddress) -> Self {
        Self::new(vec![account], ChainId(31337))
    }

    /// Make `eth_requestAccounts` fail as if the user declined.
    pub fn reject_access(&self) {
        *self.reject_access.lock().unwrap() = true;
    }

    /// Make `eth_sendTransaction` fail as if the user declined.
    pub fn reject_signing(&self) {
        *self.reject_signing.lock().unwrap() = true;
    }

    /// Queue a response for the next `method` request.
    pub fn respond(&self, method: &str, response: Result<Value, ProviderError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Switch accounts and notify subscribers.
    pub fn emit_accounts(&self, accounts: Vec<AccountAddress>) {
        *self.accounts.lock().unwrap() = accounts.clone();
        let _ = self.accounts_tx.send(accounts);
    }

    /// Switch chains and notify subscribers.
    pub fn emit_chain(&self, chain_id: ChainId) {
        *self.chain_id.lock().unwrap() = chain_id;
        let _ = self.chain_tx.send(chain_id);
    }

    /// All requests received so far (method, params).
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests for `method`.
    pub fn count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    fn scripted(&self, method: &str) -> Option<Result<Value, ProviderError>> {
        self.scripted
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
    }

    fn accounts_json(&self) -> Value {
        json!(self.accounts.lock().unwrap().clone())
    }
}

#[async_trait]
impl WalletProvider for NullWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        if let Some(response) = self.scripted(method) {
            return response;
        }

        match method {
            "eth_requestAccounts" => {
                if *self.reject_access.lock().unwrap() {
                    Err(ProviderError::rpc(4001, "User rejected the request."))
                } else {
                    Ok(self.accounts_json())
                }
            }
            "eth_accounts" => Ok(self.accounts_json()),
            "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id.lock().unwrap().0))),
            "eth_sendTransaction" => {
                if *self.reject_signing.lock().unwrap() {
                    return Err(ProviderError::rpc(4001, "User denied transaction signature."));
                }
                let mut sent = self.sent_count.lock().unwrap();
                *sent += 1;
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&sent.to_be_bytes());
                Ok(json!(TxHash::new(bytes)))
            }
            other => Err(ProviderError::rpc(
                -32601,
                format!("method {other} not scripted"),
            )),
        }
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<AccountAddress>> {
        self.accounts_tx.subscribe()
    }

    fn subscribe_chain(&self) -> broadcast::Receiver<ChainId> {
        self.chain_tx.subscribe()
    }
}
