//! Chain-agnostic core of the record registry client.
//!
//! # Architecture
//!
//! ```text
//! Boundary traits (this crate)
//!   ├── WalletGateway    - wallet extension: accounts, chain, signing
//!   └── RegistryContract - on-chain registry: submit / confirm / list
//!
//! Backends implement the traits (registry-eth, mock);
//! orchestration consumes them (registry-client).
//! ```
//!
//! The crate also owns the shared domain types, the error taxonomy, and the
//! SHA-256 content hasher. Chain-specific primitives (ABI, wei, hex chain
//! ids on the wire) stay in the backends.

pub mod error;
pub mod hasher;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export all errors
pub use error::{HashError, RegistryError, SwitchError, WalletError};

// Re-export all traits
pub use traits::{RegistryContract, WalletGateway};

// Re-export all types
pub use types::{
    AccountAddress, ChainDescriptor, ChainId, ContentDigest, HexParseError, NativeCurrency,
    PendingTransaction, REGISTRATION_FEE_UNITS, Receipt, RecordDraft, RegistryRecord, SignerRef,
    TxHash, TxStatus, WalletEvent,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRegistry, MockWallet};
