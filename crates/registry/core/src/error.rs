//! Error taxonomy for the wallet and contract boundaries.
//!
//! Every wallet/chain failure is classified here at the boundary that issued
//! the call; callers never see an unclassified error.

use crate::types::AccountAddress;

/// Failures of the wallet-extension boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// No wallet extension or node endpoint is reachable. Fatal for any
    /// connect attempt; the user must install or start one.
    #[error("no wallet is available")]
    Unavailable,

    /// The signer declined the request. The user may retry.
    #[error("request rejected by the user")]
    Rejected,

    /// The wallet responded but exposes no authorized account.
    #[error("no authorized account")]
    NoAccounts,

    /// The account exists but cannot sign state-changing calls.
    #[error("account {0} has no signing capability")]
    Unauthorized(AccountAddress),

    #[error("rpc unavailable: {0}")]
    Rpc(String),
}

/// Failures of a chain-switch request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwitchError {
    /// The wallet does not know the requested network; an add-chain request
    /// must be issued before retrying.
    #[error("chain is not known to the wallet")]
    UnknownChain,

    #[error("switch rejected by the user")]
    Rejected,

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Failures of the typed contract surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Missing or invalid contract address; every operation fails fast.
    #[error("no contract binding")]
    NoBinding,

    /// No signer is bound; writes cannot be authorized.
    #[error("no signer bound to the registry")]
    Unauthorized,

    #[error("node unreachable: {0}")]
    RpcUnavailable(String),

    /// Contract-level rejection, surfaced verbatim from the chain.
    #[error("reverted: {0}")]
    Reverted(String),

    /// The contract rejected the value transfer.
    #[error("registration fee mismatch")]
    InsufficientFee,

    #[error("transaction rejected by the user")]
    UserRejected,

    /// The session bound to this operation was replaced while it was in
    /// flight; the result has been discarded. The on-chain outcome of any
    /// dispatched transaction is unaffected.
    #[error("session superseded while operation was in flight")]
    StaleSession,

    /// The node returned bytes the codec could not interpret.
    #[error("malformed chain response: {0}")]
    Codec(String),
}

/// Failure to produce a content digest.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("input could not be read: {0}")]
    Unreadable(#[from] std::io::Error),
}
