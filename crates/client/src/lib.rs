//! Top-level client orchestrating the wallet session, registry binding,
//! submission pipeline and list view.
//!
//! # Architecture
//!
//! ```text
//! App (composition container)
//!   ├─→ WalletSession        (identity lifecycle, generations, events)
//!   ├─→ NetworkGuard         (required-chain enforcement)
//!   ├─→ RegistryClient       (typed binding, rebuilt per session change)
//!   ├─→ SubmissionController (validate → hash → submit → confirm)
//!   └─→ RecordListView       (full re-reads keyed to the refresh signal)
//! ```
//!
//! Control flow: the session establishes identity; the registry binding is
//! rebuilt whenever (contract address, session generation) changes; the
//! controller writes through the binding and bumps a refresh counter on each
//! confirmed write; the view observes the counter and re-reads the full
//! list.

mod builder;
mod controller;
mod network;
mod prefs;
mod registry;
mod session;
mod view;

pub mod logging;

pub use builder::AppBuilder;
pub use controller::{SubmissionController, SubmissionPhase, SubmitError};
pub use network::{EnsureOutcome, NetworkGuard};
pub use prefs::DisconnectPreference;
pub use registry::RegistryClient;
pub use session::{SessionEvent, SessionIdentity, SessionView, WalletSession};
pub use view::{ListState, RecordListView};

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use registry_core::{RegistryContract, RegistryError};

/// Composition container wiring the layers together.
///
/// Construct via [`AppBuilder`], then call [`App::start`] to launch the
/// background loops (wallet watcher, rebind-on-session-change, refresh
/// consumer).
pub struct App {
    pub(crate) session: Arc<WalletSession>,
    pub(crate) guard: NetworkGuard,
    pub(crate) controller: Arc<SubmissionController>,
    pub(crate) view: Arc<RecordListView>,
    pub(crate) contract: Option<Arc<dyn RegistryContract>>,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn guard(&self) -> &NetworkGuard {
        &self.guard
    }

    pub fn controller(&self) -> &Arc<SubmissionController> {
        &self.controller
    }

    pub fn view(&self) -> &Arc<RecordListView> {
        &self.view
    }

    /// Launch the background loops.
    ///
    /// - the session's wallet-notification watcher
    /// - the rebind loop: on every session establish/replace, the registry
    ///   binding is discarded and reconstructed, and the view re-reads
    /// - the refresh consumer: one full list re-read per confirmed write
    pub fn start(&self) {
        self.session.clone().spawn_watcher();

        let mut tasks = self.tasks.lock().unwrap();

        let view = self.view.clone();
        let refresh = self.controller.refresh_signal();
        tasks.push(tokio::spawn(async move {
            view.run(refresh).await;
        }));

        // Subscribe before spawning so a transition emitted right after
        // start() cannot slip past the loop.
        let events = self.session.subscribe();
        let session = self.session.clone();
        let contract = self.contract.clone();
        let controller = self.controller.clone();
        let view = self.view.clone();
        tasks.push(tokio::spawn(async move {
            run_rebind_loop(events, session, contract, controller, view).await;
        }));
    }

    /// Rebuild the registry binding from the current session and contract
    /// configuration, install it, and trigger the first-binding refresh.
    pub async fn rebind(&self) -> Result<(), RegistryError> {
        rebind(&self.session, self.contract.clone(), &self.controller, &self.view).await
    }

    pub fn shutdown(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        self.session.shutdown();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn rebind(
    session: &Arc<WalletSession>,
    contract: Option<Arc<dyn RegistryContract>>,
    controller: &Arc<SubmissionController>,
    view: &Arc<RecordListView>,
) -> Result<(), RegistryError> {
    match RegistryClient::bind(contract, session) {
        Ok(client) => {
            let client = Arc::new(client);
            controller.set_client(Some(client.clone()));
            view.set_client(Some(client));
            view.refresh().await;
            Ok(())
        }
        Err(error) => {
            controller.set_client(None);
            view.set_client(None);
            Err(error)
        }
    }
}

/// Rebuild bindings on every session transition. In-flight operations bound
/// to the old generation fail on completion via the staleness check.
async fn run_rebind_loop(
    mut events: tokio::sync::broadcast::Receiver<SessionEvent>,
    session: Arc<WalletSession>,
    contract: Option<Arc<dyn RegistryContract>>,
    controller: Arc<SubmissionController>,
    view: Arc<RecordListView>,
) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(SessionEvent::Established(_) | SessionEvent::Replaced(_)) => {
                if let Err(error) = rebind(&session, contract.clone(), &controller, &view).await {
                    tracing::warn!("registry rebind failed: {error}");
                }
            }
            Ok(SessionEvent::Ended) => {
                controller.set_client(None);
                view.set_client(None);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session events lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
