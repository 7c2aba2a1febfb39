//! App builder with dependency injection pattern.

use std::sync::Arc;

use anyhow::{Context, Result};

use registry_core::{ChainDescriptor, RegistryContract, WalletGateway};

use crate::prefs::DisconnectPreference;
use crate::session::WalletSession;
use crate::{App, NetworkGuard, RecordListView, SubmissionController};

/// Builder for constructing an [`App`].
///
/// Required: the wallet gateway and the target chain. Optional: the contract
/// surface (absent deployment configuration means every registry operation
/// fails fast with `NoBinding`) and the preference store (defaults to the
/// platform data directory).
#[derive(Default)]
pub struct AppBuilder {
    gateway: Option<Arc<dyn WalletGateway>>,
    contract: Option<Arc<dyn RegistryContract>>,
    chain: Option<ChainDescriptor>,
    prefs: Option<DisconnectPreference>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wallet gateway (required).
    pub fn gateway(mut self, gateway: impl WalletGateway + 'static) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    /// Set the registry contract surface (optional).
    pub fn contract(mut self, contract: impl RegistryContract + 'static) -> Self {
        self.contract = Some(Arc::new(contract));
        self
    }

    /// Set the chain the registry lives on (required).
    pub fn chain(mut self, chain: ChainDescriptor) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Set the disconnect-preference store (optional; tests point it at a
    /// temporary path).
    pub fn prefs(mut self, prefs: DisconnectPreference) -> Self {
        self.prefs = Some(prefs);
        self
    }

    pub fn build(self) -> Result<App> {
        let gateway = self
            .gateway
            .context("Wallet gateway is required. Use .gateway() to set it.")?;
        let chain = self
            .chain
            .context("Chain descriptor is required. Use .chain() to set it.")?;
        let prefs = match self.prefs {
            Some(prefs) => prefs,
            None => DisconnectPreference::from_project_dirs()?,
        };

        let session = Arc::new(WalletSession::new(gateway.clone(), chain.chain_id, prefs));
        let guard = NetworkGuard::new(gateway, chain);

        Ok(App {
            session,
            guard,
            controller: Arc::new(SubmissionController::new()),
            view: Arc::new(RecordListView::new()),
            contract: self.contract,
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }
}
