//! Session controller: the entry point the presentation layer talks to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ballot_gateway::ElectionContract;
use ballot_types::{AccountAddress, ChainId};
use ballot_wallet::{ConnectionEvent, ConnectionManager, SessionContext};
use tokio::sync::{broadcast, watch};

use crate::error::ClientError;
use crate::orchestrator::{Action, Orchestrator, Resync, TxEvent, TxState};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::sync::Synchronizer;

/// Capacity of the session event channel.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Result of one synchronization request.
#[derive(Clone, Debug)]
pub enum SyncOutcome {
    /// The snapshot became the current one.
    Published(Arc<Snapshot>),
    /// A newer build had already been published; this one was discarded.
    Superseded { version: u64 },
}

/// Ties the connection manager, the synchronizer, the snapshot store and the
/// orchestrator together, and applies the wallet's account and chain
/// notifications.
pub struct Controller {
    connection: Arc<ConnectionManager>,
    synchronizer: Synchronizer,
    store: SnapshotStore,
    orchestrator: Orchestrator,
    next_version: AtomicU64,
    session_events: broadcast::Sender<ConnectionEvent>,
}

impl Controller {
    pub fn new(connection: Arc<ConnectionManager>, contract: Arc<dyn ElectionContract>) -> Self {
        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            orchestrator: Orchestrator::new(Arc::clone(&contract), Arc::clone(&connection)),
            synchronizer: Synchronizer::new(contract),
            connection,
            store: SnapshotStore::new(),
            next_version: AtomicU64::new(0),
            session_events,
        }
    }

    /// Cap the candidate count a snapshot build will read.
    pub fn with_max_candidates(mut self, max: u64) -> Self {
        self.synchronizer = self.synchronizer.with_max_candidates(max);
        self
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Address of the election contract this controller mirrors.
    pub fn contract_address(&self) -> AccountAddress {
        self.synchronizer.contract().address()
    }

    /// Connect the wallet and publish the first snapshot.
    ///
    /// If the account changes while the first snapshot is being built, the
    /// connection still succeeds; the rebuild for the new account publishes
    /// instead. The returned account is the one bound when this returns.
    pub async fn connect(&self) -> Result<AccountAddress, ClientError> {
        let session = self.connection.connect().await?;
        self.store.invalidate_before(session.epoch());
        match self.build_and_publish(&session).await {
            Ok(_) => Ok(session.account()),
            Err(ClientError::StaleContext) => match self.connection.current().await {
                Some(current) => Ok(current.account()),
                None => Err(ClientError::NotConnected),
            },
            Err(e) => Err(e),
        }
    }

    /// The current (last known) snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.store.current()
    }

    /// Snapshot updates. `None` means no account-scoped data may be shown.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.store.subscribe()
    }

    /// Transaction progress of every action.
    pub fn subscribe_transactions(&self) -> broadcast::Receiver<TxEvent> {
        self.orchestrator.subscribe()
    }

    /// Applied wallet notifications (account changed, disconnected, network changed).
    pub fn subscribe_session(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.session_events.subscribe()
    }

    /// Build a snapshot for the current session and publish it unless a
    /// newer one won the race.
    ///
    /// Returns [`ClientError::StaleContext`] if the session was replaced while
    /// the build was running; the result is dropped.
    pub async fn sync(&self) -> Result<SyncOutcome, ClientError> {
        let session = self.connection.current().await.ok_or(ClientError::NotConnected)?;
        self.build_and_publish(&session).await
    }

    async fn build_and_publish(&self, session: &SessionContext) -> Result<SyncOutcome, ClientError> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.synchronizer.build(session, version).await;

        if !self.connection.is_current(session).await {
            tracing::debug!(version, epoch = session.epoch(), "dropping snapshot of superseded session");
            return Err(ClientError::StaleContext);
        }

        match self.store.publish(snapshot) {
            Some(published) => {
                tracing::debug!(version, "snapshot published");
                Ok(SyncOutcome::Published(published))
            }
            None => {
                tracing::debug!(version, "snapshot superseded by a newer build");
                Ok(SyncOutcome::Superseded { version })
            }
        }
    }

    // ── Mutating actions ───────────────────────────────────────────────

    pub async fn execute(&self, action: Action) -> TxState {
        self.orchestrator.execute(action, self).await
    }

    pub async fn register_voter(&self, address: &str) -> TxState {
        self.execute(Action::RegisterVoter(address.to_string())).await
    }

    pub async fn add_candidate(&self, name: &str) -> TxState {
        self.execute(Action::AddCandidate(name.to_string())).await
    }

    pub async fn start_voting(&self) -> TxState {
        self.execute(Action::StartVoting).await
    }

    pub async fn end_voting(&self) -> TxState {
        self.execute(Action::EndVoting).await
    }

    pub async fn vote(&self, candidate_id: u64) -> TxState {
        self.execute(Action::Vote(candidate_id)).await
    }

    // ── Wallet notifications ───────────────────────────────────────────

    /// Apply an account-set change. A new active account triggers a rebuild
    /// in the background.
    pub async fn on_accounts_changed(self: &Arc<Self>, accounts: &[AccountAddress]) -> ConnectionEvent {
        let event = self.connection.handle_accounts_changed(accounts).await;
        match &event {
            ConnectionEvent::AccountChanged(session) => {
                self.store.invalidate_before(session.epoch());
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = this.sync().await {
                        if e.kind().is_user_facing() {
                            tracing::warn!("resync after account change failed: {e}");
                        }
                    }
                });
            }
            ConnectionEvent::Disconnected { epoch } => self.store.invalidate_before(*epoch),
            ConnectionEvent::NetworkChanged { .. } | ConnectionEvent::Unchanged => {}
        }
        self.forward(&event);
        event
    }

    /// Apply a chain change. The session is discarded and must be restarted
    /// with [`Controller::connect`].
    pub async fn on_chain_changed(&self, chain_id: ChainId) -> ConnectionEvent {
        let event = self.connection.handle_chain_changed(chain_id).await;
        if let ConnectionEvent::NetworkChanged { epoch, .. } = &event {
            self.store.invalidate_before(*epoch);
            self.synchronizer.clear_owner().await;
        }
        self.forward(&event);
        event
    }

    fn forward(&self, event: &ConnectionEvent) {
        if !matches!(event, ConnectionEvent::Unchanged) {
            let _ = self.session_events.send(event.clone());
        }
    }

    /// Consume wallet notifications until `shutdown` fires.
    ///
    /// Both notification streams feed this single loop, so context
    /// replacement is applied one event at a time.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let (Some(mut accounts_rx), Some(mut chain_rx)) = (
            self.connection.subscribe_accounts(),
            self.connection.subscribe_chain(),
        ) else {
            let _ = shutdown.recv().await;
            return;
        };

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!("controller loop stopping");
                    break;
                }
                accounts = accounts_rx.recv() => match accounts {
                    Ok(accounts) => {
                        self.on_accounts_changed(&accounts).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "account notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                chain = chain_rx.recv() => match chain {
                    Ok(chain_id) => {
                        self.on_chain_changed(chain_id).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "chain notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}

#[async_trait]
impl Resync for Controller {
    async fn resync(&self) {
        match self.sync().await {
            Ok(_) => {}
            Err(e) if e.kind().is_user_facing() => tracing::warn!("resync failed: {e}"),
            Err(_) => {}
        }
    }
}
