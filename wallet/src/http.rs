//! HTTP JSON-RPC wallet provider.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ballot_types::{AccountAddress, ChainId};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::ProviderError;
use crate::provider::WalletProvider;

/// Default timeout for a single non-interactive JSON-RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Methods that wait on the user. A timed-out `eth_sendTransaction` may
/// still be signed and broadcast, so these run without a deadline.
const INTERACTIVE_METHODS: &[&str] = &["eth_requestAccounts", "eth_sendTransaction"];

/// Capacity of the account/chain notification channels.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A wallet reached over HTTP JSON-RPC 2.0 (a local signer, a node with
/// unlocked accounts, or a wallet bridge).
///
/// HTTP has no push notifications, so account and chain changes are detected
/// by [`HttpWalletProvider::spawn_watcher`], which polls `eth_accounts` and
/// `eth_chainId` and broadcasts every difference it sees.
#[derive(Clone)]
pub struct HttpWalletProvider {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
    accounts_tx: broadcast::Sender<Vec<AccountAddress>>,
    chain_tx: broadcast::Sender<ChainId>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl HttpWalletProvider {
    /// Create a provider targeting the given endpoint (e.g. `http://127.0.0.1:8545`).
    pub fn new(url: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::unreachable(format!("failed to create HTTP client: {e}")))?;
        let (accounts_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (chain_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            http,
            url: url.into(),
            next_id: Arc::new(AtomicU64::new(1)),
            accounts_tx,
            chain_tx,
        })
    }

    /// The configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start polling for account and chain changes.
    ///
    /// The first poll only records the baseline; notifications are sent for
    /// subsequent differences. Poll failures are logged and skipped.
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let provider = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_accounts: Option<Vec<AccountAddress>> = None;
            let mut last_chain: Option<ChainId> = None;

            loop {
                ticker.tick().await;

                match provider.accounts().await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            tracing::debug!(count = accounts.len(), "wallet accounts changed");
                            let _ = provider.accounts_tx.send(accounts.clone());
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(e) => tracing::debug!("eth_accounts poll failed: {e}"),
                }

                match provider.chain_id().await {
                    Ok(chain) => {
                        if last_chain.is_some_and(|prev| prev != chain) {
                            tracing::debug!(%chain, "wallet chain changed");
                            let _ = provider.chain_tx.send(chain);
                        }
                        last_chain = Some(chain);
                    }
                    Err(e) => tracing::debug!("eth_chainId poll failed: {e}"),
                }
            }
        })
    }
}

/// Deadline for one request, `None` for methods that wait on the user.
fn request_timeout(method: &str) -> Option<Duration> {
    (!INTERACTIVE_METHODS.contains(&method)).then_some(DEFAULT_TIMEOUT)
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut builder = self.http.post(&self.url).json(&body);
        if let Some(timeout) = request_timeout(method) {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::unreachable(format!("{method}: {e}"))
                } else {
                    ProviderError::invalid_response(format!("{method}: request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::invalid_response(format!(
                "{method}: wallet returned HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcResponse = response.json().await.map_err(|e| {
            ProviderError::invalid_response(format!("{method}: invalid JSON response: {e}"))
        })?;

        if let Some(err) = envelope.error {
            return Err(ProviderError::rpc(err.code, err.message));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<AccountAddress>> {
        self.accounts_tx.subscribe()
    }

    fn subscribe_chain(&self) -> broadcast::Receiver<ChainId> {
        self.chain_tx.subscribe()
    }
}
