//! Ethereum backend for the record registry client.
//!
//! Implements the `registry-core` boundary traits over JSON-RPC:
//!
//! - [`EthWalletGateway`] - the wallet boundary (EIP-1193 account methods,
//!   EIP-3085/3326 chain management) with a polling watcher standing in for
//!   extension push notifications
//! - [`EthRegistryContract`] - the typed contract surface (ABI calldata,
//!   value transfer, receipt polling, full-list decode)
//!
//! Key handling stays with the wallet/node: writes use `eth_sendTransaction`
//! against the account the session authorized.

pub mod codec;
pub mod config;
pub mod contract;
pub mod gateway;
pub mod rpc;

pub use config::EthConfig;
pub use contract::EthRegistryContract;
pub use gateway::EthWalletGateway;
pub use rpc::{JsonRpcClient, RpcError};
