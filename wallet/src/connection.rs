//! Connection manager: account authorization and context replacement.

use std::sync::Arc;

use ballot_types::{AccountAddress, ChainId};
use tokio::sync::{broadcast, RwLock};

use crate::error::WalletError;
use crate::provider::WalletProvider;
use crate::session::SessionContext;

/// Outcome of applying a wallet notification.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    /// A different account is now active; snapshots must be rebuilt.
    AccountChanged(Arc<SessionContext>),
    /// No account is authorized; account-scoped information must be cleared.
    /// `epoch` is the context generation that replaced the old session.
    Disconnected { epoch: u64 },
    /// The wallet switched chains; the whole session has been discarded and
    /// must be restarted with [`ConnectionManager::connect`].
    NetworkChanged { chain_id: ChainId, epoch: u64 },
    /// Nothing relevant changed.
    Unchanged,
}

#[derive(Default)]
struct State {
    epoch: u64,
    /// Chain the current session was established on. Cleared on network change.
    bound_chain: Option<ChainId>,
    session: Option<Arc<SessionContext>>,
}

impl State {
    /// Bind a new session for `account` under the next epoch.
    fn install(
        &mut self,
        chain_id: ChainId,
        account: AccountAddress,
        provider: Arc<dyn WalletProvider>,
    ) -> Arc<SessionContext> {
        self.epoch += 1;
        let session = Arc::new(SessionContext::new(self.epoch, chain_id, account, provider));
        self.session = Some(Arc::clone(&session));
        session
    }

    fn clear(&mut self) {
        self.epoch += 1;
        self.session = None;
    }
}

/// Owns the single active [`SessionContext`].
///
/// Every replacement (connect, account change, disconnect, network change)
/// bumps the epoch, so results computed against an older context can be
/// recognized with [`ConnectionManager::is_current`] and discarded.
pub struct ConnectionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    expected_chain: Option<ChainId>,
    state: RwLock<State>,
}

impl ConnectionManager {
    /// `provider` is `None` when no wallet is present.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, expected_chain: Option<ChainId>) -> Self {
        Self {
            provider,
            expected_chain,
            state: RwLock::new(State::default()),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    /// Request account access and bind a signing context to the first account.
    pub async fn connect(&self) -> Result<Arc<SessionContext>, WalletError> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| WalletError::Unavailable("no wallet provider configured".into()))?;

        let accounts = provider
            .request_accounts()
            .await
            .map_err(WalletError::from_access_failure)?;
        let account = *accounts
            .first()
            .ok_or_else(|| WalletError::UserRejected("no accounts authorized".into()))?;

        let chain_id = provider
            .chain_id()
            .await
            .map_err(WalletError::from_access_failure)?;
        if let Some(expected) = self.expected_chain {
            if expected != chain_id {
                return Err(WalletError::WrongNetwork {
                    expected,
                    actual: chain_id,
                });
            }
        }

        let mut state = self.state.write().await;
        state.bound_chain = Some(chain_id);
        let session = state.install(chain_id, account, provider);

        tracing::info!(%account, %chain_id, epoch = session.epoch(), "wallet connected");
        Ok(session)
    }

    /// The active session, if any.
    pub async fn current(&self) -> Option<Arc<SessionContext>> {
        self.state.read().await.session.clone()
    }

    /// Current context generation.
    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// Whether `ctx` is still the active session.
    pub async fn is_current(&self, ctx: &SessionContext) -> bool {
        self.state.read().await.epoch == ctx.epoch()
    }

    /// Apply an account-set notification.
    pub async fn handle_accounts_changed(&self, accounts: &[AccountAddress]) -> ConnectionEvent {
        let mut state = self.state.write().await;

        let Some(&first) = accounts.first() else {
            if state.session.is_none() {
                return ConnectionEvent::Unchanged;
            }
            state.clear();
            tracing::info!("wallet locked or no accounts selected");
            return ConnectionEvent::Disconnected { epoch: state.epoch };
        };

        if state.session.as_ref().is_some_and(|s| s.account() == first) {
            return ConnectionEvent::Unchanged;
        }

        // Only re-bind when a session was established on this chain before.
        let (Some(chain_id), Some(provider)) = (state.bound_chain, self.provider.clone()) else {
            return ConnectionEvent::Unchanged;
        };

        let session = state.install(chain_id, first, provider);
        tracing::info!(account = %first, epoch = session.epoch(), "active account changed");
        ConnectionEvent::AccountChanged(session)
    }

    /// Apply a chain-change notification. Any change discards the session.
    pub async fn handle_chain_changed(&self, chain_id: ChainId) -> ConnectionEvent {
        let mut state = self.state.write().await;
        if state.bound_chain == Some(chain_id) {
            return ConnectionEvent::Unchanged;
        }
        if state.bound_chain.is_none() && state.session.is_none() {
            return ConnectionEvent::Unchanged;
        }
        state.bound_chain = None;
        state.clear();
        tracing::warn!(%chain_id, "wallet switched network, session discarded");
        ConnectionEvent::NetworkChanged {
            chain_id,
            epoch: state.epoch,
        }
    }

    /// Account-set notifications from the wallet, if one is present.
    pub fn subscribe_accounts(&self) -> Option<broadcast::Receiver<Vec<AccountAddress>>> {
        self.provider.as_ref().map(|p| p.subscribe_accounts())
    }

    /// Chain notifications from the wallet, if one is present.
    pub fn subscribe_chain(&self) -> Option<broadcast::Receiver<ChainId>> {
        self.provider.as_ref().map(|p| p.subscribe_chain())
    }
}
