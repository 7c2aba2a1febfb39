//! Boundary traits for wallet and contract access.
//!
//! Two seams, mirroring the two external collaborators:
//! - `WalletGateway`: the wallet-extension boundary (accounts, chain
//!   identity, signing capability, change notifications)
//! - `RegistryContract`: the fixed call surface of the on-chain registry

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{RegistryError, SwitchError, WalletError};
use crate::types::{
    AccountAddress, ChainDescriptor, ChainId, ContentDigest, Receipt, RecordDraft, RegistryRecord,
    SignerRef, TxHash, WalletEvent,
};

/// The wallet-extension boundary.
///
/// Account and chain identity are read through this trait but mutated only by
/// the wallet itself; mutations arrive as [`WalletEvent`]s on the
/// subscription channel.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Interactive account-access request. Prompts the user.
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, WalletError>;

    /// Passive query of already-authorized accounts. Never prompts, so it is
    /// safe to call on load before the user has acted.
    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, WalletError>;

    async fn active_chain_id(&self) -> Result<ChainId, WalletError>;

    /// Derive a write-capable signer handle for an authorized account.
    async fn signer_for(&self, address: &AccountAddress) -> Result<SignerRef, WalletError>;

    /// Ask the wallet to make `chain_id` its active network.
    ///
    /// A successful return only means the request was accepted: the actual
    /// switch is observed later via a [`WalletEvent::ChainChanged`]
    /// notification, and all state derived from the old chain must be
    /// rebuilt when it fires.
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), SwitchError>;

    /// Register a network the wallet does not know yet.
    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), WalletError>;

    /// Subscribe to account/chain change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// The fixed call surface of the on-chain registry contract.
#[async_trait]
pub trait RegistryContract: Send + Sync {
    /// Dispatch one record write carrying the four text fields, the digest
    /// (empty sentinel when `None`) and a value transfer of exactly
    /// `fee_units` whole native-currency units.
    ///
    /// Returns as soon as the node accepts the transaction into its pool;
    /// confirmation is a separate suspend point.
    async fn submit_record(
        &self,
        signer: &SignerRef,
        draft: &RecordDraft,
        digest: Option<&ContentDigest>,
        fee_units: u64,
    ) -> Result<TxHash, RegistryError>;

    /// Suspend until the node reports the transaction mined.
    ///
    /// Never times out internally; callers impose their own timeout or
    /// cancellation. Cancelling the wait leaves the on-chain outcome
    /// untouched.
    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, RegistryError>;

    /// Read the full ordered record set. No signer required.
    async fn list_records(&self) -> Result<Vec<RegistryRecord>, RegistryError>;
}
