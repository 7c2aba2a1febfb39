//! Wallet session lifecycle.
//!
//! The session owns the identity used to authorize writes (account address,
//! chain id, signer capability) and the subscription to wallet change
//! notifications. Identity is an explicitly owned, versioned value: every
//! account or chain change produces a *new* `SessionIdentity` with a fresh
//! generation number, and downstream consumers compare generations to detect
//! staleness instead of relying on object identity or timing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use registry_core::{
    AccountAddress, ChainId, SignerRef, WalletError, WalletEvent, WalletGateway,
};

use crate::prefs::DisconnectPreference;

/// The identity of one connected session. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub address: AccountAddress,
    pub chain_id: ChainId,
    pub signer: SignerRef,
    /// Monotonically increasing across all sessions of this client instance.
    pub generation: u64,
}

#[derive(Debug, Clone, Default)]
enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(SessionIdentity),
}

/// Presentation of the session state against the required chain.
///
/// `WrongNetwork` is a view of Connected: the address is already known and
/// needs no re-fetch, only the chain differs from the required one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    Disconnected,
    Connecting,
    Connected {
        address: AccountAddress,
        chain_id: ChainId,
    },
    WrongNetwork {
        address: AccountAddress,
        active: ChainId,
        required: ChainId,
    },
}

/// Discrete transitions emitted to downstream layers.
///
/// `Replaced` carries the rebuilt identity after an account or chain change;
/// everything bound to the previous generation must be discarded.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Established(SessionIdentity),
    Replaced(SessionIdentity),
    Ended,
}

/// At most one active session per client instance.
pub struct WalletSession {
    gateway: Arc<dyn WalletGateway>,
    required_chain: ChainId,
    prefs: DisconnectPreference,
    state: Mutex<SessionState>,
    generations: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl WalletSession {
    pub fn new(
        gateway: Arc<dyn WalletGateway>,
        required_chain: ChainId,
        prefs: DisconnectPreference,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            gateway,
            required_chain,
            prefs,
            state: Mutex::new(SessionState::Disconnected),
            generations: AtomicU64::new(0),
            events,
            watcher: Mutex::new(None),
        }
    }

    /// Start consuming wallet notifications. The subscription lives for the
    /// session's lifetime and is torn down by [`shutdown`] or drop.
    ///
    /// The task holds only a weak reference, so dropping the last session
    /// handle still tears everything down.
    ///
    /// [`shutdown`]: WalletSession::shutdown
    pub fn spawn_watcher(self: Arc<Self>) {
        let mut guard = self.watcher.lock().unwrap();
        if guard.is_some() {
            return;
        }

        let weak = Arc::downgrade(&self);
        let mut events = self.gateway.subscribe();
        *guard = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "wallet notifications lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(session) = weak.upgrade() else {
                    break;
                };
                match event {
                    WalletEvent::AccountsChanged(accounts) => {
                        session.on_accounts_changed(accounts).await;
                    }
                    WalletEvent::ChainChanged(chain) => {
                        session.on_chain_changed(chain);
                    }
                }
            }
        }));
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.watcher.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn required_chain(&self) -> ChainId {
        self.required_chain
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        match &*self.state.lock().unwrap() {
            SessionState::Connected(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    /// Generation of the current session, if any. In-flight operations
    /// compare this against the generation they captured at dispatch.
    pub fn current_generation(&self) -> Option<u64> {
        self.identity().map(|identity| identity.generation)
    }

    pub fn view(&self) -> SessionView {
        match &*self.state.lock().unwrap() {
            SessionState::Disconnected => SessionView::Disconnected,
            SessionState::Connecting => SessionView::Connecting,
            SessionState::Connected(identity) if identity.chain_id != self.required_chain => {
                SessionView::WrongNetwork {
                    address: identity.address,
                    active: identity.chain_id,
                    required: self.required_chain,
                }
            }
            SessionState::Connected(identity) => SessionView::Connected {
                address: identity.address,
                chain_id: identity.chain_id,
            },
        }
    }

    /// Interactive connect. Clears the durable disconnect preference, then
    /// derives signer, address and chain id as one atomic unit; any failure
    /// rolls the whole transition back to Disconnected.
    pub async fn connect(&self) -> Result<SessionIdentity, WalletError> {
        if let Err(e) = self.prefs.clear() {
            tracing::warn!("failed to clear disconnect preference: {e}");
        }

        *self.state.lock().unwrap() = SessionState::Connecting;
        match self.establish(true).await {
            Ok(identity) => Ok(self.commit(identity, false)),
            Err(error) => {
                *self.state.lock().unwrap() = SessionState::Disconnected;
                tracing::warn!("wallet connect failed: {error}");
                Err(error)
            }
        }
    }

    /// Passive reconnect on load: queries already-authorized accounts
    /// without prompting, and is gated by the durable disconnect preference.
    pub async fn try_resume(&self) -> Result<Option<SessionIdentity>, WalletError> {
        if self.prefs.user_disconnected() {
            tracing::debug!("auto-reconnect suppressed by disconnect preference");
            return Ok(None);
        }

        let accounts = self.gateway.authorized_accounts().await?;
        if accounts.is_empty() {
            return Ok(None);
        }

        *self.state.lock().unwrap() = SessionState::Connecting;
        match self.establish(false).await {
            Ok(identity) => Ok(Some(self.commit(identity, false))),
            Err(error) => {
                *self.state.lock().unwrap() = SessionState::Disconnected;
                Err(error)
            }
        }
    }

    /// Explicit disconnect. Records the durable preference so a later load
    /// does not silently re-enter Connected without user action.
    pub fn disconnect(&self) {
        if let Err(e) = self.prefs.set_disconnected() {
            tracing::warn!("failed to persist disconnect preference: {e}");
        }
        self.end_session();
    }

    async fn establish(&self, interactive: bool) -> Result<SessionIdentity, WalletError> {
        let accounts = if interactive {
            self.gateway.request_accounts().await?
        } else {
            self.gateway.authorized_accounts().await?
        };
        let address = accounts.into_iter().next().ok_or(WalletError::NoAccounts)?;
        let signer = self.gateway.signer_for(&address).await?;
        let chain_id = self.gateway.active_chain_id().await?;

        Ok(SessionIdentity {
            address,
            chain_id,
            signer,
            generation: self.next_generation(),
        })
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, identity: SessionIdentity, replaced: bool) -> SessionIdentity {
        *self.state.lock().unwrap() = SessionState::Connected(identity.clone());
        tracing::info!(
            address = %identity.address.short(),
            chain = %identity.chain_id,
            generation = identity.generation,
            "wallet session {}",
            if replaced { "rebuilt" } else { "established" }
        );
        let event = if replaced {
            SessionEvent::Replaced(identity.clone())
        } else {
            SessionEvent::Established(identity.clone())
        };
        let _ = self.events.send(event);
        identity
    }

    fn end_session(&self) {
        let was_active = {
            let mut state = self.state.lock().unwrap();
            let was_active = !matches!(*state, SessionState::Disconnected);
            *state = SessionState::Disconnected;
            was_active
        };
        if was_active {
            tracing::info!("wallet session ended");
            let _ = self.events.send(SessionEvent::Ended);
        }
    }

    async fn on_accounts_changed(&self, accounts: Vec<AccountAddress>) {
        let Some(current) = self.identity() else {
            // No session to update; connecting flows read accounts themselves.
            return;
        };

        if accounts.is_empty() {
            tracing::info!("wallet revoked account access");
            self.end_session();
            return;
        }

        if accounts.first() == Some(&current.address) {
            return;
        }

        // Different account: full session rebuild, downstream bindings are
        // discarded via the generation bump, not patched.
        match self.establish(false).await {
            Ok(identity) => {
                self.commit(identity, true);
            }
            Err(error) => {
                tracing::warn!("session rebuild after account change failed: {error}");
                self.end_session();
            }
        }
    }

    fn on_chain_changed(&self, chain: ChainId) {
        let rebuilt = {
            let mut state = self.state.lock().unwrap();
            match &*state {
                SessionState::Connected(identity) if identity.chain_id != chain => {
                    // Address and signer carry over; the chain (and the
                    // generation) do not.
                    let rebuilt = SessionIdentity {
                        address: identity.address,
                        chain_id: chain,
                        signer: identity.signer.clone(),
                        generation: self.next_generation(),
                    };
                    *state = SessionState::Connected(rebuilt.clone());
                    Some(rebuilt)
                }
                _ => None,
            }
        };

        if let Some(identity) = rebuilt {
            tracing::info!(chain = %chain, generation = identity.generation, "active chain changed");
            let _ = self.events.send(SessionEvent::Replaced(identity));
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
