//! Network identity enforcement.

use std::sync::Arc;

use registry_core::{ChainDescriptor, ChainId, SwitchError, WalletError, WalletGateway};

/// Outcome of a chain-enforcement attempt.
///
/// `SwitchRequested` means exactly that: the wallet accepted the request,
/// but the switch itself is only observed later via a chain-changed
/// notification. Callers must treat all chain-derived state as stale until
/// that notification triggers the session rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyActive,
    SwitchRequested,
}

/// Validates and, on request, negotiates the wallet's active chain against
/// the required one.
pub struct NetworkGuard {
    gateway: Arc<dyn WalletGateway>,
    target: ChainDescriptor,
}

impl NetworkGuard {
    pub fn new(gateway: Arc<dyn WalletGateway>, target: ChainDescriptor) -> Self {
        Self { gateway, target }
    }

    pub fn required_chain(&self) -> ChainId {
        self.target.chain_id
    }

    pub async fn current_chain_id(&self) -> Result<ChainId, WalletError> {
        self.gateway.active_chain_id().await
    }

    /// Ask the wallet to activate the required chain.
    ///
    /// If the wallet does not know the network, issues an add-chain request
    /// carrying the full descriptor (display name, RPC URL, currency,
    /// chain id) and retries the switch once.
    pub async fn ensure_chain(&self) -> Result<EnsureOutcome, SwitchError> {
        let active = self.gateway.active_chain_id().await.map_err(SwitchError::Wallet)?;
        if active == self.target.chain_id {
            return Ok(EnsureOutcome::AlreadyActive);
        }

        tracing::info!(
            active = %active,
            required = %self.target.chain_id,
            "wrong network; requesting switch"
        );

        match self.gateway.switch_chain(self.target.chain_id).await {
            Ok(()) => Ok(EnsureOutcome::SwitchRequested),
            Err(SwitchError::UnknownChain) => {
                self.gateway
                    .add_chain(&self.target)
                    .await
                    .map_err(SwitchError::Wallet)?;
                self.gateway.switch_chain(self.target.chain_id).await?;
                Ok(EnsureOutcome::SwitchRequested)
            }
            Err(error) => Err(error),
        }
    }
}
